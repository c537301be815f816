//! Volunteer profile and statistics DTOs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Volunteer, VolunteerLevel, VolunteerStats};

/// Request body for `POST /volunteers`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVolunteerRequest {
    /// Identifier of the authenticated user; generated when absent.
    #[serde(default)]
    pub id: Option<uuid::Uuid>,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Volunteer profile representation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VolunteerDto {
    /// Volunteer identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Credited hours.
    pub total_hours: u64,
    /// Credited attendances.
    pub events_attended: u32,
    /// Profile creation timestamp.
    pub joined_at: DateTime<Utc>,
}

impl From<Volunteer> for VolunteerDto {
    fn from(v: Volunteer) -> Self {
        Self {
            id: v.id.into(),
            name: v.name,
            email: v.email,
            total_hours: v.total_hours,
            events_attended: v.events_attended,
            joined_at: v.joined_at,
        }
    }
}

/// Response body for `GET /volunteers/{id}/stats`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VolunteerStatsDto {
    /// Credited attendances.
    pub total_events: u32,
    /// Credited hours.
    pub total_hours: u64,
    /// Attended participations per category; every category is present.
    pub categories_participated: BTreeMap<String, u32>,
    /// Active registrations in open events.
    pub upcoming_events: u32,
    /// 1-based position by hours.
    pub rank: u32,
    /// Tier derived from hours.
    pub level: VolunteerLevel,
}

impl From<VolunteerStats> for VolunteerStatsDto {
    fn from(s: VolunteerStats) -> Self {
        Self {
            total_events: s.total_events,
            total_hours: s.total_hours,
            categories_participated: s
                .categories_participated
                .into_iter()
                .map(|(category, count)| (category.as_str().to_string(), count))
                .collect(),
            upcoming_events: s.upcoming_events,
            rank: s.rank,
            level: s.level,
        }
    }
}
