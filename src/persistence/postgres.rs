//! PostgreSQL implementation of the persistence layer.
//!
//! Ledger units run in a transaction. Each guarded write is a single
//! conditional `UPDATE ... WHERE status = ANY(...)` whose affected-row count
//! decides the outcome, so concurrent writers in other processes cannot
//! double-book a seat or double-credit hours.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::{
    EVENT_COLUMNS, EventRow, NOTIFICATION_COLUMNS, NotificationRow, PARTICIPATION_COLUMNS,
    ParticipationRow, VOLUNTEER_COLUMNS, VolunteerRow, event_from_row, notification_from_row,
    participation_from_row, signed, volunteer_from_row,
};
use super::{
    AttendanceOutcome, EnrollOutcome, EventStore, LedgerStore, NotificationStore,
    ParticipationStore, ReleaseOutcome, StoreError, TransitionOutcome, VolunteerStore,
};
use crate::config::DatabaseConfig;
use crate::domain::{
    Event, EventFilter, EventId, EventStatus, Notification, NotificationId, Participation,
    ParticipationFilter, ParticipationId, ParticipationStatus, Volunteer, VolunteerId,
};

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with `config` and, when enabled, applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails and
    /// [`StoreError::Migration`] if a migration fails.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;
        if config.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("database migrations applied");
        }
        tracing::info!(
            max_connections = config.max_connections,
            "connected to PostgreSQL"
        );
        Ok(Self::new(pool))
    }
}

fn status_strings<T: Copy>(statuses: &[T], as_str: fn(T) -> &'static str) -> Vec<String> {
    statuses.iter().map(|s| as_str(*s).to_string()).collect()
}

fn map_unique(err: sqlx::Error, what: String) -> StoreError {
    if err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        StoreError::Duplicate(what)
    } else {
        StoreError::Database(err)
    }
}

async fn fetch_participation_status(
    tx: &mut sqlx::PgConnection,
    id: ParticipationId,
) -> Result<Option<ParticipationStatus>, StoreError> {
    let row = sqlx::query_scalar::<_, String>("SELECT status FROM participations WHERE id = $1")
        .bind(Uuid::from(id))
        .fetch_optional(&mut *tx)
        .await?;
    row.map(|s| {
        s.parse::<ParticipationStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    })
    .transpose()
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?;
        row.map(event_from_row).transpose()
    }

    async fn get_events(&self, ids: &[EventId]) -> Result<Vec<Event>, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(event_from_row).collect()
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError> {
        let statuses = status_strings(&filter.statuses, EventStatus::as_str);
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE (cardinality($1::text[]) = 0 OR status = ANY($1)) \
               AND ($2::text IS NULL OR category = $2) \
               AND ($3::timestamptz IS NULL OR end_time < $3) \
             ORDER BY start_time ASC, id ASC"
        ))
        .bind(&statuses)
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.ends_before)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(event_from_row).collect()
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO events (id, title, description, location, start_time, end_time, \
             max_participants, current_participants, category, status, hours, organizer_id, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(Uuid::from(event.id))
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(signed::<i32, _>(event.max_participants, "max_participants")?)
        .bind(signed::<i32, _>(event.current_participants, "current_participants")?)
        .bind(event.category.as_str())
        .bind(event.status.as_str())
        .bind(signed::<i32, _>(event.hours, "hours")?)
        .bind(event.organizer_id)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, format!("event {}", event.id)))?;
        Ok(())
    }

    async fn update_event_details(&self, event: &Event) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET title = $2, description = $3, location = $4, start_time = $5, \
             end_time = $6, max_participants = $7, category = $8, hours = $9, updated_at = $10 \
             WHERE id = $1 AND current_participants <= $7 \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(Uuid::from(event.id))
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(signed::<i32, _>(event.max_participants, "max_participants")?)
        .bind(event.category.as_str())
        .bind(signed::<i32, _>(event.hours, "hours")?)
        .bind(event.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(event_from_row).transpose()
    }

    async fn transition_event(
        &self,
        id: EventId,
        from: &[EventStatus],
        to: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, StoreError> {
        let from = status_strings(from, EventStatus::as_str);
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = ANY($2) RETURNING {EVENT_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(&from)
        .bind(to.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(event_from_row).transpose()
    }

    async fn delete_event(&self, id: EventId) -> Result<Option<u64>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM participations WHERE event_id = $1")
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        tx.commit().await?;
        Ok(Some(removed))
    }
}

#[async_trait]
impl ParticipationStore for PostgresStore {
    async fn get_participation(
        &self,
        id: ParticipationId,
    ) -> Result<Option<Participation>, StoreError> {
        let row = sqlx::query_as::<_, ParticipationRow>(&format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?;
        row.map(participation_from_row).transpose()
    }

    async fn list_participations(
        &self,
        filter: &ParticipationFilter,
    ) -> Result<Vec<Participation>, StoreError> {
        let statuses = status_strings(&filter.statuses, ParticipationStatus::as_str);
        let rows = sqlx::query_as::<_, ParticipationRow>(&format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM participations \
             WHERE ($1::uuid IS NULL OR event_id = $1) \
               AND ($2::uuid IS NULL OR volunteer_id = $2) \
               AND (cardinality($3::text[]) = 0 OR status = ANY($3)) \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(filter.event_id.map(Uuid::from))
        .bind(filter.volunteer_id.map(Uuid::from))
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(participation_from_row).collect()
    }

    async fn transition_participation(
        &self,
        id: ParticipationId,
        from: &[ParticipationStatus],
        to: ParticipationStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let from = status_strings(from, ParticipationStatus::as_str);
        let row = sqlx::query_as::<_, ParticipationRow>(&format!(
            "UPDATE participations SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = ANY($2) RETURNING {PARTICIPATION_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(&from)
        .bind(to.as_str())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match row {
            Some(row) => TransitionOutcome::Applied(participation_from_row(row)?),
            None => match fetch_participation_status(&mut tx, id).await? {
                Some(status) => TransitionOutcome::Rejected(status),
                None => TransitionOutcome::Missing,
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl VolunteerStore for PostgresStore {
    async fn get_volunteer(&self, id: VolunteerId) -> Result<Option<Volunteer>, StoreError> {
        let row = sqlx::query_as::<_, VolunteerRow>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?;
        row.map(volunteer_from_row).transpose()
    }

    async fn insert_volunteer(&self, volunteer: &Volunteer) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO volunteers (id, name, email, total_hours, events_attended, joined_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(volunteer.id))
        .bind(&volunteer.name)
        .bind(&volunteer.email)
        .bind(signed::<i64, _>(volunteer.total_hours, "total_hours")?)
        .bind(signed::<i32, _>(volunteer.events_attended, "events_attended")?)
        .bind(volunteer.joined_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, format!("volunteer {}", volunteer.id)))?;
        Ok(())
    }

    async fn list_volunteers_by_hours(&self) -> Result<Vec<Volunteer>, StoreError> {
        let rows = sqlx::query_as::<_, VolunteerRow>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers ORDER BY total_hours DESC, seq ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(volunteer_from_row).collect()
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, title, message, kind, related_id, read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::from(notification.id))
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.related_id)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(notification_from_row).collect()
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE notifications SET read = true WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result =
            sqlx::query("UPDATE notifications SET read = true WHERE user_id = $1 AND read = false")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn enroll(&self, participation: &Participation) -> Result<EnrollOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let event_id = Uuid::from(participation.event_id);

        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET current_participants = current_participants + 1 \
             WHERE id = $1 AND current_participants < max_participants \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)",
            )
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.rollback().await?;
            return Ok(if exists {
                EnrollOutcome::Full
            } else {
                EnrollOutcome::EventMissing
            });
        };
        let event = event_from_row(row)?;

        sqlx::query(
            "INSERT INTO participations (id, event_id, volunteer_id, status, hours_logged, \
             feedback, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::from(participation.id))
        .bind(event_id)
        .bind(Uuid::from(participation.volunteer_id))
        .bind(participation.status.as_str())
        .bind(signed::<i32, _>(participation.hours_logged, "hours_logged")?)
        .bind(&participation.feedback)
        .bind(participation.created_at)
        .bind(participation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_unique(
                e,
                format!(
                    "active participation for volunteer {} in event {}",
                    participation.volunteer_id, participation.event_id
                ),
            )
        })?;

        tx.commit().await?;
        Ok(EnrollOutcome::Enrolled {
            participation: participation.clone(),
            event,
        })
    }

    async fn release(
        &self,
        id: ParticipationId,
        to: ParticipationStatus,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let active = status_strings(&ParticipationStatus::ACTIVE, ParticipationStatus::as_str);
        let row = sqlx::query_as::<_, ParticipationRow>(&format!(
            "UPDATE participations SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = ANY($2) RETURNING {PARTICIPATION_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(&active)
        .bind(to.as_str())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let outcome = match fetch_participation_status(&mut tx, id).await? {
                Some(status) => ReleaseOutcome::Rejected(status),
                None => ReleaseOutcome::Missing,
            };
            tx.rollback().await?;
            return Ok(outcome);
        };
        let participation = participation_from_row(row)?;

        let current = sqlx::query_scalar::<_, i32>(
            "UPDATE events SET current_participants = GREATEST(current_participants - 1, 0), \
             updated_at = $2 WHERE id = $1 RETURNING current_participants",
        )
        .bind(Uuid::from(participation.event_id))
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(0);

        tx.commit().await?;
        Ok(ReleaseOutcome::Released {
            participation,
            current_participants: u32::try_from(current).unwrap_or(0),
        })
    }

    async fn record_attendance(
        &self,
        id: ParticipationId,
        hours_logged: u32,
        now: DateTime<Utc>,
    ) -> Result<AttendanceOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let active = status_strings(&ParticipationStatus::ACTIVE, ParticipationStatus::as_str);
        let hours = signed::<i32, _>(hours_logged, "hours_logged")?;

        let row = sqlx::query_as::<_, ParticipationRow>(&format!(
            "UPDATE participations SET status = 'attended', hours_logged = $3, updated_at = $4 \
             WHERE id = $1 AND status = ANY($2) RETURNING {PARTICIPATION_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(&active)
        .bind(hours)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let outcome = match fetch_participation_status(&mut tx, id).await? {
                Some(status) => AttendanceOutcome::Rejected(status),
                None => AttendanceOutcome::Missing,
            };
            tx.rollback().await?;
            return Ok(outcome);
        };
        let participation = participation_from_row(row)?;

        let credited = sqlx::query(
            "UPDATE volunteers SET total_hours = total_hours + $2, \
             events_attended = events_attended + 1 WHERE id = $1",
        )
        .bind(Uuid::from(participation.volunteer_id))
        .bind(i64::from(hours))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if credited == 0 {
            tx.rollback().await?;
            return Ok(AttendanceOutcome::VolunteerMissing(participation.volunteer_id));
        }
        tx.commit().await?;
        Ok(AttendanceOutcome::Recorded(participation))
    }
}
