//! Persistence layer: store traits plus in-memory and PostgreSQL backends.
//!
//! Each entity has its own data-access trait offering get / list / insert /
//! update / delete. [`LedgerStore`] adds the three cross-entity units that
//! must apply atomically:
//!
//! - [`LedgerStore::enroll`]: conditional seat increment + participation insert
//! - [`LedgerStore::release`]: status change + clamped seat decrement
//! - [`LedgerStore::record_attendance`]: status change + volunteer credit
//!
//! These are the only paths that write `current_participants` or the
//! volunteer aggregates. Services hold the umbrella [`Store`] as
//! `Arc<dyn Store>`.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Event, EventFilter, EventId, EventStatus, Notification, NotificationId, Participation,
    ParticipationFilter, ParticipationId, ParticipationStatus, Volunteer, VolunteerId,
};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Store-level failure: connectivity, corruption or constraint violations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness constraint was violated.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// A stored row could not be mapped back into the domain.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The backend is unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of [`LedgerStore::enroll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    /// Seat taken; carries the new participation and the updated event.
    Enrolled {
        /// Participation as stored.
        participation: Participation,
        /// Event after the seat increment.
        event: Event,
    },
    /// The conditional increment found no free seat.
    Full,
    /// The event no longer exists.
    EventMissing,
}

/// Result of a guarded participation transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Applied; carries the updated participation.
    Applied(Participation),
    /// The participation does not exist.
    Missing,
    /// The participation was not in one of the expected statuses.
    Rejected(ParticipationStatus),
}

/// Result of [`LedgerStore::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Status changed and seat released; carries both sides.
    Released {
        /// Participation after the transition.
        participation: Participation,
        /// Seats taken after the decrement.
        current_participants: u32,
    },
    /// The participation does not exist.
    Missing,
    /// The participation was not active.
    Rejected(ParticipationStatus),
}

/// Result of [`LedgerStore::record_attendance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceOutcome {
    /// Participation marked attended and volunteer credited.
    Recorded(Participation),
    /// The participation does not exist.
    Missing,
    /// The participation was not active (already attended, cancelled, ...).
    Rejected(ParticipationStatus),
    /// The owning volunteer profile does not exist; nothing was written.
    VolunteerMissing(VolunteerId),
}

/// Event data access.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fetches one event.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// Fetches several events; missing ids are skipped.
    async fn get_events(&self, ids: &[EventId]) -> Result<Vec<Event>, StoreError>;

    /// Lists events passing `filter`, ordered by start time.
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError>;

    /// Inserts a new event.
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Overwrites the descriptive fields of an event (title, description,
    /// location, times, capacity, category, hours, `updated_at`).
    ///
    /// Never writes `current_participants` or `status`. The write is rejected
    /// (returns `None`) if `max_participants` would drop below the stored
    /// `current_participants`.
    async fn update_event_details(&self, event: &Event) -> Result<Option<Event>, StoreError>;

    /// Moves an event to `to` if its current status is one of `from`.
    ///
    /// Returns the updated event, or `None` if it is missing or in another
    /// status.
    async fn transition_event(
        &self,
        id: EventId,
        from: &[EventStatus],
        to: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, StoreError>;

    /// Deletes an event and every participation referencing it.
    ///
    /// Returns the number of participations removed, or `None` if the event
    /// did not exist.
    async fn delete_event(&self, id: EventId) -> Result<Option<u64>, StoreError>;
}

/// Participation data access.
#[async_trait]
pub trait ParticipationStore: Send + Sync {
    /// Fetches one participation.
    async fn get_participation(
        &self,
        id: ParticipationId,
    ) -> Result<Option<Participation>, StoreError>;

    /// Lists participations passing `filter`, oldest first.
    async fn list_participations(
        &self,
        filter: &ParticipationFilter,
    ) -> Result<Vec<Participation>, StoreError>;

    /// Moves a participation to `to` if its status is one of `from`.
    ///
    /// Not for transitions that touch seats or hours; see [`LedgerStore`].
    async fn transition_participation(
        &self,
        id: ParticipationId,
        from: &[ParticipationStatus],
        to: ParticipationStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StoreError>;
}

/// Volunteer data access.
#[async_trait]
pub trait VolunteerStore: Send + Sync {
    /// Fetches one volunteer.
    async fn get_volunteer(&self, id: VolunteerId) -> Result<Option<Volunteer>, StoreError>;

    /// Inserts a new volunteer profile.
    async fn insert_volunteer(&self, volunteer: &Volunteer) -> Result<(), StoreError>;

    /// Lists every volunteer ordered by `total_hours` descending; ties keep
    /// profile creation order.
    async fn list_volunteers_by_hours(&self) -> Result<Vec<Volunteer>, StoreError>;
}

/// Notification data access.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Inserts a notification.
    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// Lists a user's notifications, newest first.
    async fn list_notifications(
        &self,
        user_id: uuid::Uuid,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Marks one notification read. Returns `false` if it does not exist.
    async fn mark_notification_read(&self, id: NotificationId) -> Result<bool, StoreError>;

    /// Marks all of a user's notifications read. Returns how many changed.
    async fn mark_all_notifications_read(&self, user_id: uuid::Uuid) -> Result<u64, StoreError>;
}

/// Cross-entity atomic units.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Takes a seat and inserts `participation` as one unit.
    ///
    /// The increment is conditional on `current_participants <
    /// max_participants`; when it fails nothing is written.
    async fn enroll(&self, participation: &Participation) -> Result<EnrollOutcome, StoreError>;

    /// Moves an active participation to `to` (`cancelled` or `no_show`) and
    /// decrements the event's seat counter, clamped at zero, as one unit.
    async fn release(
        &self,
        id: ParticipationId,
        to: ParticipationStatus,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome, StoreError>;

    /// Marks an active participation `attended` with `hours_logged`, and
    /// credits the owning volunteer's aggregates, as one unit.
    ///
    /// Guarded on the prior status, so a retried call never credits twice.
    async fn record_attendance(
        &self,
        id: ParticipationId,
        hours_logged: u32,
        now: DateTime<Utc>,
    ) -> Result<AttendanceOutcome, StoreError>;
}

/// Umbrella over every data-access trait.
pub trait Store:
    EventStore + ParticipationStore + VolunteerStore + NotificationStore + LedgerStore + std::fmt::Debug
{
}

impl<T> Store for T where
    T: EventStore
        + ParticipationStore
        + VolunteerStore
        + NotificationStore
        + LedgerStore
        + std::fmt::Debug
{
}
