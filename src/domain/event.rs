//! Volunteer events, their categories and lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EventId;
use crate::error::HubError;

/// Returned when a stored enum discriminator string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    /// Which enumeration was being parsed.
    pub kind: &'static str,
    /// The offending value.
    pub value: String,
}

/// Fixed set of event categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Environmental clean-ups, planting and similar.
    Environment,
    /// Tutoring and education projects.
    Education,
    /// Healthcare and blood drives.
    Health,
    /// Local community support.
    Community,
    /// Animal shelters and wildlife.
    Animal,
    /// Anything else.
    Other,
}

impl EventCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Environment,
        Self::Education,
        Self::Health,
        Self::Community,
        Self::Animal,
        Self::Other,
    ];

    /// Storage / wire discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Education => "education",
            Self::Health => "health",
            Self::Community => "community",
            Self::Animal => "animal",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "event category",
                value: s.to_string(),
            })
    }
}

/// Event lifecycle.
///
/// ```text
/// upcoming ──► ongoing ──► completed
///    │            │
///    └────────────┴──► cancelled
/// ```
///
/// `completed` and `cancelled` are terminal. Only the completion sweeper
/// moves events to `completed`; nothing moves `upcoming` to `ongoing`
/// automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Scheduled, not yet started.
    Upcoming,
    /// In progress.
    Ongoing,
    /// Ended and reconciled by the sweeper.
    Completed,
    /// Cancelled by the organizer.
    Cancelled,
}

impl EventStatus {
    /// Storage / wire discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// `true` for `upcoming` and `ongoing`.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Upcoming | Self::Ongoing)
    }

    /// `true` for `completed` and `cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_open()
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Upcoming, Self::Ongoing)
                | (Self::Upcoming | Self::Ongoing, Self::Completed)
                | (Self::Upcoming | Self::Ongoing, Self::Cancelled)
        )
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownVariant {
                kind: "event status",
                value: other.to_string(),
            }),
        }
    }
}

/// A scheduled volunteer activity with a capacity and a category.
///
/// `current_participants` is a cached counter of active registrations. It is
/// written only through the store's ledger operations (enroll / withdraw),
/// which keep `0 <= current_participants <= max_participants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Free-form location.
    pub location: String,
    /// Start instant.
    pub start_time: DateTime<Utc>,
    /// End instant, strictly after `start_time`.
    pub end_time: DateTime<Utc>,
    /// Capacity, always positive.
    pub max_participants: u32,
    /// Active registrations.
    pub current_participants: u32,
    /// Category.
    pub category: EventCategory,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Hours credited per attendance.
    pub hours: u32,
    /// Organizer reference (not owned).
    pub organizer_id: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Builds a fresh `upcoming` event with no participants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] if the draft fails validation.
    pub fn create(draft: NewEvent, now: DateTime<Utc>) -> Result<Self, HubError> {
        draft.validate()?;
        Ok(Self {
            id: EventId::new(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            location: draft.location,
            start_time: draft.start_time,
            end_time: draft.end_time,
            max_participants: draft.max_participants,
            current_participants: 0,
            category: draft.category,
            status: EventStatus::Upcoming,
            hours: draft.hours,
            organizer_id: draft.organizer_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// `true` once `now` has reached the start instant.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }

    /// `true` once `now` is strictly past the end instant.
    #[must_use]
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time < now
    }

    /// `true` when no seat is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    /// Remaining seats.
    #[must_use]
    pub const fn seats_left(&self) -> u32 {
        self.max_participants.saturating_sub(self.current_participants)
    }
}

/// Organizer input for a new event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewEvent {
    /// Short title, must not be blank.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Free-form location.
    #[serde(default)]
    pub location: String,
    /// Start instant.
    pub start_time: DateTime<Utc>,
    /// End instant.
    pub end_time: DateTime<Utc>,
    /// Capacity.
    pub max_participants: u32,
    /// Category.
    pub category: EventCategory,
    /// Hours credited per attendance.
    pub hours: u32,
    /// Organizer reference.
    pub organizer_id: uuid::Uuid,
}

impl NewEvent {
    /// Checks field-level invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] describing the first violation.
    pub fn validate(&self) -> Result<(), HubError> {
        validate_fields(
            &self.title,
            self.start_time,
            self.end_time,
            self.max_participants,
            self.hours,
        )
    }
}

/// Partial organizer update. Absent fields are left unchanged.
///
/// Neither `current_participants` nor `status` can be changed this way.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EventPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New location.
    pub location: Option<String>,
    /// New start instant.
    pub start_time: Option<DateTime<Utc>>,
    /// New end instant.
    pub end_time: Option<DateTime<Utc>>,
    /// New capacity; may not drop below the current registrations.
    pub max_participants: Option<u32>,
    /// New category.
    pub category: Option<EventCategory>,
    /// New credited hours.
    pub hours: Option<u32>,
}

impl EventPatch {
    /// Applies the patch to `event`, validating the merged result.
    ///
    /// `event` is left untouched when validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] if the merged event would violate
    /// an invariant.
    pub fn apply(&self, event: &mut Event, now: DateTime<Utc>) -> Result<(), HubError> {
        let title = self.title.as_deref().unwrap_or(&event.title).trim();
        let start = self.start_time.unwrap_or(event.start_time);
        let end = self.end_time.unwrap_or(event.end_time);
        let max = self.max_participants.unwrap_or(event.max_participants);
        let hours = self.hours.unwrap_or(event.hours);

        validate_fields(title, start, end, max, hours)?;
        if max < event.current_participants {
            return Err(HubError::InvalidRequest(format!(
                "max_participants {max} is below current registrations {}",
                event.current_participants
            )));
        }

        event.title = title.to_string();
        if let Some(description) = &self.description {
            event.description.clone_from(description);
        }
        if let Some(location) = &self.location {
            event.location.clone_from(location);
        }
        event.start_time = start;
        event.end_time = end;
        event.max_participants = max;
        if let Some(category) = self.category {
            event.category = category;
        }
        event.hours = hours;
        event.updated_at = now;
        Ok(())
    }
}

/// Largest count (seats, hours) a record may hold; the SQL schema stores
/// these as `INTEGER`.
pub const MAX_COUNT: u32 = 2_147_483_647;

fn validate_fields(
    title: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_participants: u32,
    hours: u32,
) -> Result<(), HubError> {
    if title.trim().is_empty() {
        return Err(HubError::InvalidRequest("title must not be empty".to_string()));
    }
    if end <= start {
        return Err(HubError::InvalidRequest(
            "end_time must be after start_time".to_string(),
        ));
    }
    if max_participants == 0 {
        return Err(HubError::InvalidRequest(
            "max_participants must be positive".to_string(),
        ));
    }
    if hours == 0 {
        return Err(HubError::InvalidRequest("hours must be positive".to_string()));
    }
    if max_participants > MAX_COUNT || hours > MAX_COUNT {
        return Err(HubError::InvalidRequest(format!(
            "max_participants and hours must not exceed {MAX_COUNT}"
        )));
    }
    Ok(())
}

/// Equality filters for listing events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Keep only events whose status is in this set (empty = any).
    pub statuses: Vec<EventStatus>,
    /// Keep only this category.
    pub category: Option<EventCategory>,
    /// Keep only events ending strictly before this instant.
    pub ends_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    /// Whether `event` passes every filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&event.status))
            && self.category.is_none_or(|c| c == event.category)
            && self.ends_before.is_none_or(|t| event.end_time < t)
    }
}
