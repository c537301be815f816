//! Event DTOs for create, update, get and list operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::PaginationMeta;
use crate::domain::{Event, EventCategory, EventFilter, EventStatus};

/// Event representation returned by every event endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventDto {
    /// Event identifier.
    pub id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Location.
    pub location: String,
    /// Start instant.
    pub start_time: DateTime<Utc>,
    /// End instant.
    pub end_time: DateTime<Utc>,
    /// Capacity.
    pub max_participants: u32,
    /// Seats taken.
    pub current_participants: u32,
    /// Seats left.
    pub seats_left: u32,
    /// Category.
    pub category: EventCategory,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Hours credited per attendance.
    pub hours: u32,
    /// Organizer reference.
    pub organizer_id: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventDto {
    fn from(event: Event) -> Self {
        let seats_left = event.seats_left();
        Self {
            id: event.id.into(),
            title: event.title,
            description: event.description,
            location: event.location,
            start_time: event.start_time,
            end_time: event.end_time,
            max_participants: event.max_participants,
            current_participants: event.current_participants,
            seats_left,
            category: event.category,
            status: event.status,
            hours: event.hours,
            organizer_id: event.organizer_id,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Query filters for `GET /events`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventQuery {
    /// Keep only events with this status.
    pub status: Option<EventStatus>,
    /// Keep only events in this category.
    pub category: Option<EventCategory>,
}

impl From<EventQuery> for EventFilter {
    fn from(query: EventQuery) -> Self {
        Self {
            statuses: query.status.into_iter().collect(),
            category: query.category,
            ends_before: None,
        }
    }
}

/// Paginated list response for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events ordered by start time.
    pub data: Vec<EventDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Response body for `DELETE /events/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteEventResponse {
    /// Deleted event.
    pub event_id: uuid::Uuid,
    /// Participations removed with it.
    pub participations_removed: u64,
}
