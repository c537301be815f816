//! Row shapes and their mapping to domain types.
//!
//! Rows are fetched as tuples with `sqlx::query_as`; enum columns are stored
//! as their snake_case discriminators and counters as signed integers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::StoreError;
use crate::domain::{
    Event, EventId, Notification, NotificationId, Participation, ParticipationId, Volunteer,
    VolunteerId,
};

/// Column list matching [`EventRow`].
pub const EVENT_COLUMNS: &str = "id, title, description, location, start_time, end_time, \
     max_participants, current_participants, category, status, hours, organizer_id, \
     created_at, updated_at";

/// Column list matching [`ParticipationRow`].
pub const PARTICIPATION_COLUMNS: &str =
    "id, event_id, volunteer_id, status, hours_logged, feedback, created_at, updated_at";

/// Column list matching [`VolunteerRow`].
pub const VOLUNTEER_COLUMNS: &str = "id, name, email, total_hours, events_attended, joined_at";

/// Column list matching [`NotificationRow`].
pub const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, kind, related_id, read, created_at";

/// A row of the `events` table.
pub type EventRow = (
    Uuid,
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    i32,
    i32,
    String,
    String,
    i32,
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// A row of the `participations` table.
pub type ParticipationRow = (
    Uuid,
    Uuid,
    Uuid,
    String,
    i32,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// A row of the `volunteers` table.
pub type VolunteerRow = (Uuid, String, String, i64, i32, DateTime<Utc>);

/// A row of the `notifications` table.
pub type NotificationRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    Option<Uuid>,
    bool,
    DateTime<Utc>,
);

fn parse<T>(value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Corrupt(e.to_string()))
}

fn unsigned<T, S>(value: S, column: &str) -> Result<T, StoreError>
where
    T: TryFrom<S>,
    S: Copy + std::fmt::Display,
{
    T::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

/// Converts a count into the signed column type.
///
/// # Errors
///
/// Returns [`StoreError::Corrupt`] if the value does not fit.
pub fn signed<T, S>(value: S, column: &str) -> Result<T, StoreError>
where
    T: TryFrom<S>,
    S: Copy + std::fmt::Display,
{
    T::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} too large: {value}")))
}

/// Maps an [`EventRow`] into an [`Event`].
///
/// # Errors
///
/// Returns [`StoreError::Corrupt`] for unknown discriminators or negative
/// counters.
pub fn event_from_row(row: EventRow) -> Result<Event, StoreError> {
    let (
        id,
        title,
        description,
        location,
        start_time,
        end_time,
        max_participants,
        current_participants,
        category,
        status,
        hours,
        organizer_id,
        created_at,
        updated_at,
    ) = row;
    Ok(Event {
        id: EventId::from_uuid(id),
        title,
        description,
        location,
        start_time,
        end_time,
        max_participants: unsigned(max_participants, "max_participants")?,
        current_participants: unsigned(current_participants, "current_participants")?,
        category: parse(&category)?,
        status: parse(&status)?,
        hours: unsigned(hours, "hours")?,
        organizer_id,
        created_at,
        updated_at,
    })
}

/// Maps a [`ParticipationRow`] into a [`Participation`].
///
/// # Errors
///
/// Returns [`StoreError::Corrupt`] for an unknown status or negative hours.
pub fn participation_from_row(row: ParticipationRow) -> Result<Participation, StoreError> {
    let (id, event_id, volunteer_id, status, hours_logged, feedback, created_at, updated_at) = row;
    Ok(Participation {
        id: ParticipationId::from_uuid(id),
        event_id: EventId::from_uuid(event_id),
        volunteer_id: VolunteerId::from_uuid(volunteer_id),
        status: parse(&status)?,
        hours_logged: unsigned(hours_logged, "hours_logged")?,
        feedback,
        created_at,
        updated_at,
    })
}

/// Maps a [`VolunteerRow`] into a [`Volunteer`].
///
/// # Errors
///
/// Returns [`StoreError::Corrupt`] for negative aggregates.
pub fn volunteer_from_row(row: VolunteerRow) -> Result<Volunteer, StoreError> {
    let (id, name, email, total_hours, events_attended, joined_at) = row;
    Ok(Volunteer {
        id: VolunteerId::from_uuid(id),
        name,
        email,
        total_hours: unsigned(total_hours, "total_hours")?,
        events_attended: unsigned(events_attended, "events_attended")?,
        joined_at,
    })
}

/// Maps a [`NotificationRow`] into a [`Notification`].
///
/// # Errors
///
/// Returns [`StoreError::Corrupt`] for an unknown kind.
pub fn notification_from_row(row: NotificationRow) -> Result<Notification, StoreError> {
    let (id, user_id, title, message, kind, related_id, read, created_at) = row;
    Ok(Notification {
        id: NotificationId::from_uuid(id),
        user_id,
        title,
        message,
        kind: parse(&kind)?,
        related_id,
        read,
        created_at,
    })
}
