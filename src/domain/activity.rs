//! Domain activity reflecting event and participation mutations.
//!
//! Every state change publishes an [`ActivityEvent`] through the
//! [`super::EventBus`]. Activity is broadcast to WebSocket subscribers
//! following the affected event.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EventId, EventStatus, ParticipationId, VolunteerId};

/// Why a seat was released.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatReleaseReason {
    /// The volunteer cancelled.
    Cancelled,
    /// The organizer marked a no-show.
    NoShow,
}

/// Activity emitted after every state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "activity_type", rename_all = "snake_case")]
pub enum ActivityEvent {
    /// A new event was published.
    EventCreated {
        /// Event identifier.
        event_id: EventId,
        /// Event title.
        title: String,
        /// Capacity.
        max_participants: u32,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Organizer edited an event.
    EventUpdated {
        /// Event identifier.
        event_id: EventId,
        /// Capacity after the edit.
        max_participants: u32,
        /// Edit timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Status moved to `cancelled` or `completed`.
    EventStatusChanged {
        /// Event identifier.
        event_id: EventId,
        /// New status.
        status: EventStatus,
        /// Participations credited by this transition (completion only).
        credited_participations: u32,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Event and its participations were deleted.
    EventDeleted {
        /// Event identifier.
        event_id: EventId,
        /// Deletion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A volunteer took a seat.
    ParticipantRegistered {
        /// Event identifier.
        event_id: EventId,
        /// New participation.
        participation_id: ParticipationId,
        /// Volunteer.
        volunteer_id: VolunteerId,
        /// Seats taken after registration.
        current_participants: u32,
        /// Capacity.
        max_participants: u32,
        /// Registration timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A seat was given back.
    SeatReleased {
        /// Event identifier.
        event_id: EventId,
        /// Participation that released it.
        participation_id: ParticipationId,
        /// Volunteer.
        volunteer_id: VolunteerId,
        /// Why.
        reason: SeatReleaseReason,
        /// Seats taken after the release.
        current_participants: u32,
        /// Release timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A registration was confirmed.
    ParticipationConfirmed {
        /// Event identifier.
        event_id: EventId,
        /// Participation.
        participation_id: ParticipationId,
        /// Volunteer.
        volunteer_id: VolunteerId,
        /// Confirmation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Attendance was recorded and hours credited.
    AttendanceRecorded {
        /// Event identifier.
        event_id: EventId,
        /// Participation.
        participation_id: ParticipationId,
        /// Volunteer.
        volunteer_id: VolunteerId,
        /// Hours credited.
        hours_logged: u32,
        /// Recording timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl ActivityEvent {
    /// Returns the event id this activity concerns.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        match self {
            Self::EventCreated { event_id, .. }
            | Self::EventUpdated { event_id, .. }
            | Self::EventStatusChanged { event_id, .. }
            | Self::EventDeleted { event_id, .. }
            | Self::ParticipantRegistered { event_id, .. }
            | Self::SeatReleased { event_id, .. }
            | Self::ParticipationConfirmed { event_id, .. }
            | Self::AttendanceRecorded { event_id, .. } => *event_id,
        }
    }

    /// Returns the activity type as a static string slice.
    #[must_use]
    pub const fn activity_type_str(&self) -> &'static str {
        match self {
            Self::EventCreated { .. } => "event_created",
            Self::EventUpdated { .. } => "event_updated",
            Self::EventStatusChanged { .. } => "event_status_changed",
            Self::EventDeleted { .. } => "event_deleted",
            Self::ParticipantRegistered { .. } => "participant_registered",
            Self::SeatReleased { .. } => "seat_released",
            Self::ParticipationConfirmed { .. } => "participation_confirmed",
            Self::AttendanceRecorded { .. } => "attendance_recorded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_serializes_with_tag() {
        let event = ActivityEvent::ParticipantRegistered {
            event_id: EventId::new(),
            participation_id: ParticipationId::new(),
            volunteer_id: VolunteerId::new(),
            current_participants: 3,
            max_participants: 10,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"activity_type\":\"participant_registered\""));
        assert!(json.contains("\"current_participants\":3"));
    }

    #[test]
    fn event_id_accessor() {
        let id = EventId::new();
        let event = ActivityEvent::EventDeleted {
            event_id: id,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_id(), id);
        assert_eq!(event.activity_type_str(), "event_deleted");
    }
}
