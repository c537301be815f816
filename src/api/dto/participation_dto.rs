//! Participation DTOs for registration and organizer transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{MAX_COUNT, Participation, ParticipationStatus};
use crate::error::HubError;

/// Request body for `POST /events/{id}/registrations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Volunteer taking the seat.
    pub volunteer_id: uuid::Uuid,
}

/// Request body for `POST /participations/{id}/attendance`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AttendanceRequest {
    /// Hours to credit.
    pub hours_logged: u32,
}

impl AttendanceRequest {
    /// Hours to credit, bounded by what a participation record can store.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] above [`MAX_COUNT`].
    pub fn validated_hours(&self) -> Result<u32, HubError> {
        if self.hours_logged > MAX_COUNT {
            return Err(HubError::InvalidRequest(format!(
                "hours_logged must not exceed {MAX_COUNT}"
            )));
        }
        Ok(self.hours_logged)
    }
}

/// Participation representation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipationDto {
    /// Participation identifier.
    pub id: uuid::Uuid,
    /// Event.
    pub event_id: uuid::Uuid,
    /// Volunteer.
    pub volunteer_id: uuid::Uuid,
    /// Lifecycle status.
    pub status: ParticipationStatus,
    /// Hours credited on attendance.
    pub hours_logged: u32,
    /// Optional free-form feedback.
    pub feedback: Option<String>,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last transition timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Participation> for ParticipationDto {
    fn from(p: Participation) -> Self {
        Self {
            id: p.id.into(),
            event_id: p.event_id.into(),
            volunteer_id: p.volunteer_id.into(),
            status: p.status,
            hours_logged: p.hours_logged,
            feedback: p.feedback,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Converts a list of participations.
#[must_use]
pub fn participation_dtos(items: Vec<Participation>) -> Vec<ParticipationDto> {
    items.into_iter().map(ParticipationDto::from).collect()
}
