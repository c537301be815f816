//! Volunteer-to-event participation records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::event::UnknownVariant;
use super::{EventId, ParticipationId, VolunteerId};

/// Participation lifecycle.
///
/// ```text
/// registered ──► confirmed ──► attended
///     │              │
///     ├──────────────┴──► cancelled
///     └──────────────┴──► no_show
/// ```
///
/// `attended`, `cancelled` and `no_show` are terminal. An organizer may also
/// record attendance directly on a `registered` participation; the completion
/// sweeper never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    /// Seat reserved.
    Registered,
    /// Attendance confirmed ahead of the event.
    Confirmed,
    /// Attended; hours credited.
    Attended,
    /// Withdrawn by the volunteer or by policy.
    Cancelled,
    /// Did not show up (organizer decision).
    NoShow,
}

impl ParticipationStatus {
    /// Statuses that hold a seat.
    pub const ACTIVE: [Self; 2] = [Self::Registered, Self::Confirmed];

    /// Storage / wire discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Confirmed => "confirmed",
            Self::Attended => "attended",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    /// `true` for `registered` and `confirmed`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Registered | Self::Confirmed)
    }

    /// `true` for `attended`, `cancelled` and `no_show`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Registered, Self::Confirmed)
                | (Self::Registered | Self::Confirmed, Self::Attended)
                | (
                    Self::Registered | Self::Confirmed,
                    Self::Cancelled | Self::NoShow
                )
        )
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(Self::Registered),
            "confirmed" => Ok(Self::Confirmed),
            "attended" => Ok(Self::Attended),
            "cancelled" => Ok(Self::Cancelled),
            "no_show" => Ok(Self::NoShow),
            other => Err(UnknownVariant {
                kind: "participation status",
                value: other.to_string(),
            }),
        }
    }
}

/// The relationship record between one volunteer and one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    /// Participation identifier.
    pub id: ParticipationId,
    /// Event participated in.
    pub event_id: EventId,
    /// Volunteer who owns this record.
    pub volunteer_id: VolunteerId,
    /// Lifecycle status.
    pub status: ParticipationStatus,
    /// Credited hours, zero until attendance is recorded.
    pub hours_logged: u32,
    /// Optional free-form feedback.
    pub feedback: Option<String>,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Participation {
    /// A fresh `registered` record with no hours.
    #[must_use]
    pub fn registered(event_id: EventId, volunteer_id: VolunteerId, now: DateTime<Utc>) -> Self {
        Self {
            id: ParticipationId::new(),
            event_id,
            volunteer_id,
            status: ParticipationStatus::Registered,
            hours_logged: 0,
            feedback: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Equality filters for listing participations.
#[derive(Debug, Clone, Default)]
pub struct ParticipationFilter {
    /// Keep only this event.
    pub event_id: Option<EventId>,
    /// Keep only this volunteer.
    pub volunteer_id: Option<VolunteerId>,
    /// Keep only these statuses (empty = any).
    pub statuses: Vec<ParticipationStatus>,
}

impl ParticipationFilter {
    /// All participations of one event.
    #[must_use]
    pub fn for_event(event_id: EventId) -> Self {
        Self {
            event_id: Some(event_id),
            ..Self::default()
        }
    }

    /// All participations of one volunteer.
    #[must_use]
    pub fn for_volunteer(volunteer_id: VolunteerId) -> Self {
        Self {
            volunteer_id: Some(volunteer_id),
            ..Self::default()
        }
    }

    /// Restricts the filter to the given statuses.
    #[must_use]
    pub fn with_statuses(mut self, statuses: &[ParticipationStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    /// Whether `participation` passes every filter.
    #[must_use]
    pub fn matches(&self, participation: &Participation) -> bool {
        self.event_id.is_none_or(|id| id == participation.event_id)
            && self
                .volunteer_id
                .is_none_or(|id| id == participation.volunteer_id)
            && (self.statuses.is_empty() || self.statuses.contains(&participation.status))
    }
}
