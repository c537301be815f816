//! Registration service: seat booking and the participation lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::NotificationService;
use crate::domain::activity::SeatReleaseReason;
use crate::domain::{
    ActivityEvent, Clock, EventBus, EventId, NotificationKind, Participation, ParticipationFilter,
    ParticipationId, ParticipationStatus, VolunteerId,
};
use crate::error::HubError;
use crate::persistence::{
    AttendanceOutcome, EnrollOutcome, ReleaseOutcome, Store, StoreError, TransitionOutcome,
};

/// Statuses that block a new registration for the same volunteer.
const BLOCKING: [ParticipationStatus; 4] = [
    ParticipationStatus::Registered,
    ParticipationStatus::Confirmed,
    ParticipationStatus::Attended,
    ParticipationStatus::NoShow,
];

/// Per-event mutexes serializing seat decisions.
///
/// Decisions on the same event queue up; different events never contend.
/// Entries only live while some task holds or waits on them: idle mutexes
/// are pruned whenever a new one is inserted.
#[derive(Debug, Default)]
struct EventLocks {
    locks: RwLock<HashMap<EventId, Arc<Mutex<()>>>>,
}

impl EventLocks {
    async fn get(&self, event_id: EventId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(&event_id) {
            return Arc::clone(lock);
        }
        let mut map = self.locks.write().await;
        // the map's own reference is the only one left on an idle mutex
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(map.entry(event_id).or_default())
    }

    async fn forget(&self, event_id: EventId) {
        self.locks.write().await.remove(&event_id);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.read().await.len()
    }
}

/// Books and releases seats, and moves participations through their
/// lifecycle.
///
/// This is the only writer of `current_participants`. Every seat decision
/// runs under the event's mutex, and the store applies the counter change
/// with a conditional write, so a second process sharing the database can
/// at worst lose a race (reported as [`HubError::Conflict`]), never overbook.
#[derive(Debug)]
pub struct RegistrationService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    notifications: NotificationService,
    event_bus: EventBus,
    locks: EventLocks,
}

impl RegistrationService {
    /// Creates a new `RegistrationService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        notifications: NotificationService,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            clock,
            notifications,
            event_bus,
            locks: EventLocks::default(),
        }
    }

    /// Registers `volunteer_id` for `event_id`.
    ///
    /// Checks, first failure wins: the event exists, it has not started and
    /// is still open, the volunteer holds no participation other than a
    /// cancelled one, and a seat is free.
    ///
    /// # Errors
    ///
    /// [`HubError::NotFound`], [`HubError::RegistrationClosed`],
    /// [`HubError::AlreadyRegistered`], [`HubError::EventFull`], or
    /// [`HubError::Conflict`] when another process took the last seat first.
    pub async fn register(
        &self,
        event_id: EventId,
        volunteer_id: VolunteerId,
    ) -> Result<Participation, HubError> {
        let lock = self.locks.get(event_id).await;
        let _guard = lock.lock().await;

        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| HubError::not_found("event", event_id))?;

        let now = self.clock.now();
        if event.has_started(now) {
            tracing::debug!(%event_id, %volunteer_id, "registration rejected: event started");
            return Err(HubError::RegistrationClosed(
                "event already started".to_string(),
            ));
        }
        if event.status.is_terminal() {
            tracing::debug!(%event_id, %volunteer_id, status = %event.status, "registration rejected: event closed");
            return Err(HubError::RegistrationClosed(format!(
                "event is {}",
                event.status
            )));
        }

        let existing = self
            .store
            .list_participations(&ParticipationFilter {
                event_id: Some(event_id),
                volunteer_id: Some(volunteer_id),
                statuses: BLOCKING.to_vec(),
            })
            .await?;
        if !existing.is_empty() {
            tracing::debug!(%event_id, %volunteer_id, "registration rejected: already registered");
            return Err(HubError::AlreadyRegistered);
        }

        if event.is_full() {
            tracing::debug!(%event_id, %volunteer_id, "registration rejected: event full");
            return Err(HubError::EventFull);
        }

        let participation = Participation::registered(event_id, volunteer_id, now);
        let (participation, event) = match self.store.enroll(&participation).await {
            Ok(EnrollOutcome::Enrolled {
                participation,
                event,
            }) => (participation, event),
            Ok(EnrollOutcome::Full) => {
                return Err(HubError::Conflict(
                    "the last seat was taken by a concurrent registration".to_string(),
                ));
            }
            Ok(EnrollOutcome::EventMissing) => return Err(HubError::not_found("event", event_id)),
            Err(StoreError::Duplicate(_)) => return Err(HubError::AlreadyRegistered),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            %event_id,
            %volunteer_id,
            participation_id = %participation.id,
            current = event.current_participants,
            max = event.max_participants,
            "volunteer registered"
        );

        self.notifications
            .notify(
                volunteer_id.into(),
                "Registration successful",
                &format!("You are registered for \"{}\".", event.title),
                NotificationKind::Event,
                Some(event_id.into()),
            )
            .await;

        let _ = self.event_bus.publish(ActivityEvent::ParticipantRegistered {
            event_id,
            participation_id: participation.id,
            volunteer_id,
            current_participants: event.current_participants,
            max_participants: event.max_participants,
            timestamp: now,
        });

        Ok(participation)
    }

    /// Cancels the volunteer's active participation in `event_id` and
    /// releases the seat.
    ///
    /// Cancelling when nothing is active changes nothing.
    ///
    /// # Errors
    ///
    /// [`HubError::NotFound`] if the volunteer never registered, and
    /// [`HubError::InvalidState`] if no participation is still active.
    pub async fn cancel(
        &self,
        event_id: EventId,
        volunteer_id: VolunteerId,
    ) -> Result<Participation, HubError> {
        let lock = self.locks.get(event_id).await;
        let _guard = lock.lock().await;

        let records = self
            .store
            .list_participations(&ParticipationFilter {
                event_id: Some(event_id),
                volunteer_id: Some(volunteer_id),
                statuses: Vec::new(),
            })
            .await?;
        if records.is_empty() {
            return Err(HubError::not_found("participation", volunteer_id));
        }
        let Some(active) = records.iter().find(|p| p.status.is_active()) else {
            tracing::debug!(%event_id, %volunteer_id, "cancel ignored: nothing active");
            return Err(HubError::InvalidState(
                "no active participation to cancel".to_string(),
            ));
        };

        let participation = self
            .release(active.id, SeatReleaseReason::Cancelled)
            .await?;

        self.notifications
            .notify(
                volunteer_id.into(),
                "Registration cancelled",
                "Your participation has been cancelled.",
                NotificationKind::Event,
                Some(event_id.into()),
            )
            .await;

        Ok(participation)
    }

    /// Confirms a `registered` participation.
    ///
    /// # Errors
    ///
    /// [`HubError::NotFound`] or [`HubError::InvalidState`] when the
    /// participation is not `registered`.
    pub async fn confirm(&self, participation_id: ParticipationId) -> Result<Participation, HubError> {
        let now = self.clock.now();
        let outcome = self
            .store
            .transition_participation(
                participation_id,
                &[ParticipationStatus::Registered],
                ParticipationStatus::Confirmed,
                now,
            )
            .await?;

        let participation = match outcome {
            TransitionOutcome::Applied(p) => p,
            TransitionOutcome::Missing => {
                return Err(HubError::not_found("participation", participation_id));
            }
            TransitionOutcome::Rejected(status) => {
                return Err(HubError::InvalidState(format!(
                    "cannot confirm a {status} participation"
                )));
            }
        };

        tracing::info!(%participation_id, event_id = %participation.event_id, "participation confirmed");

        self.notifications
            .notify(
                participation.volunteer_id.into(),
                "Participation confirmed",
                "Your attendance has been confirmed.",
                NotificationKind::Event,
                Some(participation.event_id.into()),
            )
            .await;

        let _ = self.event_bus.publish(ActivityEvent::ParticipationConfirmed {
            event_id: participation.event_id,
            participation_id,
            volunteer_id: participation.volunteer_id,
            timestamp: now,
        });

        Ok(participation)
    }

    /// Marks an active participation attended and credits the volunteer
    /// with `hours_logged` in one unit.
    ///
    /// A participation that is already attended is rejected, so hours are
    /// never credited twice.
    ///
    /// # Errors
    ///
    /// [`HubError::NotFound`] for a missing participation or volunteer
    /// profile, [`HubError::InvalidState`] if the participation is not active.
    pub async fn mark_attended(
        &self,
        participation_id: ParticipationId,
        hours_logged: u32,
    ) -> Result<Participation, HubError> {
        let now = self.clock.now();
        let participation = match self
            .store
            .record_attendance(participation_id, hours_logged, now)
            .await?
        {
            AttendanceOutcome::Recorded(p) => p,
            AttendanceOutcome::Missing => {
                return Err(HubError::not_found("participation", participation_id));
            }
            AttendanceOutcome::Rejected(status) => {
                return Err(HubError::InvalidState(format!(
                    "cannot record attendance for a {status} participation"
                )));
            }
            AttendanceOutcome::VolunteerMissing(volunteer_id) => {
                return Err(HubError::not_found("volunteer", volunteer_id));
            }
        };

        tracing::info!(
            %participation_id,
            event_id = %participation.event_id,
            volunteer_id = %participation.volunteer_id,
            hours_logged,
            "attendance recorded"
        );

        self.notifications
            .notify(
                participation.volunteer_id.into(),
                "Hours credited",
                &format!("{hours_logged} volunteer hours have been added to your profile."),
                NotificationKind::Event,
                Some(participation.event_id.into()),
            )
            .await;

        let _ = self.event_bus.publish(ActivityEvent::AttendanceRecorded {
            event_id: participation.event_id,
            participation_id,
            volunteer_id: participation.volunteer_id,
            hours_logged,
            timestamp: now,
        });

        Ok(participation)
    }

    /// Marks an active participation `no_show` and releases its seat.
    ///
    /// # Errors
    ///
    /// [`HubError::NotFound`] or [`HubError::InvalidState`] when the
    /// participation is not active.
    pub async fn mark_no_show(
        &self,
        participation_id: ParticipationId,
    ) -> Result<Participation, HubError> {
        let current = self
            .store
            .get_participation(participation_id)
            .await?
            .ok_or_else(|| HubError::not_found("participation", participation_id))?;

        let lock = self.locks.get(current.event_id).await;
        let _guard = lock.lock().await;
        self.release(participation_id, SeatReleaseReason::NoShow)
            .await
    }

    /// Drops the mutex of an event that was deleted or reached a final
    /// status.
    pub(crate) async fn forget_event(&self, event_id: EventId) {
        self.locks.forget(event_id).await;
    }

    #[cfg(test)]
    pub(crate) async fn tracked_events(&self) -> usize {
        self.locks.len().await
    }

    /// Releases a seat. Callers hold the event's mutex.
    async fn release(
        &self,
        participation_id: ParticipationId,
        reason: SeatReleaseReason,
    ) -> Result<Participation, HubError> {
        let to = match reason {
            SeatReleaseReason::Cancelled => ParticipationStatus::Cancelled,
            SeatReleaseReason::NoShow => ParticipationStatus::NoShow,
        };
        let now = self.clock.now();
        let (participation, current_participants) =
            match self.store.release(participation_id, to, now).await? {
                ReleaseOutcome::Released {
                    participation,
                    current_participants,
                } => (participation, current_participants),
                ReleaseOutcome::Missing => {
                    return Err(HubError::not_found("participation", participation_id));
                }
                ReleaseOutcome::Rejected(status) => {
                    return Err(HubError::InvalidState(format!(
                        "cannot mark a {status} participation as {to}"
                    )));
                }
            };

        tracing::info!(
            %participation_id,
            event_id = %participation.event_id,
            status = %to,
            current = current_participants,
            "seat released"
        );

        let _ = self.event_bus.publish(ActivityEvent::SeatReleased {
            event_id: participation.event_id,
            participation_id,
            volunteer_id: participation.volunteer_id,
            reason,
            current_participants,
            timestamp: now,
        });

        Ok(participation)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::service::test_support::{Harness, hours_of};

    #[tokio::test]
    async fn register_takes_a_seat() {
        let h = Harness::new();
        let event = h.event_with_capacity(3).await;
        let volunteer = h.volunteer("Ana").await;

        let Ok(p) = h.registrations.register(event, volunteer).await else {
            panic!("registration failed");
        };
        assert_eq!(p.status, ParticipationStatus::Registered);
        assert_eq!(p.hours_logged, 0);
        assert_eq!(h.seats_taken(event).await, 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_never_overbook() {
        let h = Harness::new();
        let event = h.event_with_capacity(5).await;
        let registrations = Arc::clone(&h.registrations);

        let mut handles = Vec::new();
        for _ in 0..40 {
            let registrations = Arc::clone(&registrations);
            handles.push(tokio::spawn(async move {
                registrations.register(event, VolunteerId::new()).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("task panicked");
            };
            match result {
                Ok(_) => accepted += 1,
                Err(HubError::EventFull | HubError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(accepted, 5);
        assert_eq!(h.seats_taken(event).await, 5);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let h = Harness::new();
        let event = h.event_with_capacity(3).await;
        let volunteer = h.volunteer("Ana").await;

        assert!(h.registrations.register(event, volunteer).await.is_ok());
        assert!(matches!(
            h.registrations.register(event, volunteer).await,
            Err(HubError::AlreadyRegistered)
        ));
        assert_eq!(h.seats_taken(event).await, 1);
    }

    #[tokio::test]
    async fn full_event_is_reported_before_enrolling() {
        let h = Harness::new();
        let event = h.event_with_capacity(1).await;
        assert!(h.registrations.register(event, VolunteerId::new()).await.is_ok());
        assert!(matches!(
            h.registrations.register(event, VolunteerId::new()).await,
            Err(HubError::EventFull)
        ));
    }

    #[tokio::test]
    async fn started_event_is_closed() {
        let h = Harness::new();
        let event = h.event_with_capacity(3).await;
        h.clock.advance(chrono::Duration::days(2));
        assert!(matches!(
            h.registrations.register(event, VolunteerId::new()).await,
            Err(HubError::RegistrationClosed(_))
        ));
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let h = Harness::new();
        assert!(matches!(
            h.registrations
                .register(EventId::new(), VolunteerId::new())
                .await,
            Err(HubError::NotFound { entity: "event", .. })
        ));
    }

    #[tokio::test]
    async fn cancel_then_register_again() {
        let h = Harness::new();
        let event = h.event_with_capacity(2).await;
        let volunteer = h.volunteer("Ana").await;

        assert!(h.registrations.register(event, volunteer).await.is_ok());
        let Ok(cancelled) = h.registrations.cancel(event, volunteer).await else {
            panic!("cancel failed");
        };
        assert_eq!(cancelled.status, ParticipationStatus::Cancelled);
        assert_eq!(h.seats_taken(event).await, 0);

        assert!(h.registrations.register(event, volunteer).await.is_ok());
        assert_eq!(h.seats_taken(event).await, 1);
    }

    #[tokio::test]
    async fn cancel_without_active_record_changes_nothing() {
        let h = Harness::new();
        let event = h.event_with_capacity(2).await;
        let volunteer = h.volunteer("Ana").await;
        assert!(h.registrations.register(event, VolunteerId::new()).await.is_ok());

        assert!(matches!(
            h.registrations.cancel(event, volunteer).await,
            Err(HubError::NotFound { .. })
        ));
        assert_eq!(h.seats_taken(event).await, 1);

        assert!(h.registrations.register(event, volunteer).await.is_ok());
        assert!(h.registrations.cancel(event, volunteer).await.is_ok());
        assert!(matches!(
            h.registrations.cancel(event, volunteer).await,
            Err(HubError::InvalidState(_))
        ));
        assert_eq!(h.seats_taken(event).await, 1);
    }

    #[tokio::test]
    async fn cancel_after_attendance_is_rejected() {
        let h = Harness::new();
        let event = h.event_with_capacity(2).await;
        let volunteer = h.volunteer("Ana").await;
        let Ok(p) = h.registrations.register(event, volunteer).await else {
            panic!("registration failed");
        };
        assert!(h.registrations.mark_attended(p.id, 3).await.is_ok());

        assert!(matches!(
            h.registrations.cancel(event, volunteer).await,
            Err(HubError::InvalidState(_))
        ));
        assert_eq!(h.seats_taken(event).await, 1);
    }

    #[tokio::test]
    async fn confirm_only_from_registered() {
        let h = Harness::new();
        let event = h.event_with_capacity(2).await;
        let volunteer = h.volunteer("Ana").await;
        let Ok(p) = h.registrations.register(event, volunteer).await else {
            panic!("registration failed");
        };

        let Ok(confirmed) = h.registrations.confirm(p.id).await else {
            panic!("confirm failed");
        };
        assert_eq!(confirmed.status, ParticipationStatus::Confirmed);
        assert!(matches!(
            h.registrations.confirm(p.id).await,
            Err(HubError::InvalidState(_))
        ));

        assert!(h.registrations.cancel(event, volunteer).await.is_ok());
        assert!(matches!(
            h.registrations.confirm(p.id).await,
            Err(HubError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn mark_attended_credits_once() {
        let h = Harness::new();
        let event = h.event_with_capacity(2).await;
        let volunteer = h.volunteer("Ana").await;
        let Ok(p) = h.registrations.register(event, volunteer).await else {
            panic!("registration failed");
        };

        assert!(h.registrations.mark_attended(p.id, 4).await.is_ok());
        assert!(matches!(
            h.registrations.mark_attended(p.id, 4).await,
            Err(HubError::InvalidState(_))
        ));
        assert_eq!(hours_of(&h, volunteer).await, 4);
    }

    #[tokio::test]
    async fn no_show_releases_the_seat() {
        let h = Harness::new();
        let event = h.event_with_capacity(2).await;
        let Ok(p) = h.registrations.register(event, VolunteerId::new()).await else {
            panic!("registration failed");
        };

        let Ok(after) = h.registrations.mark_no_show(p.id).await else {
            panic!("no-show failed");
        };
        assert_eq!(after.status, ParticipationStatus::NoShow);
        assert_eq!(h.seats_taken(event).await, 0);
        assert!(matches!(
            h.registrations.mark_no_show(p.id).await,
            Err(HubError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn register_publishes_seat_counts() {
        let h = Harness::new();
        let event = h.event_with_capacity(4).await;
        let mut rx = h.event_bus.subscribe();

        assert!(h.registrations.register(event, VolunteerId::new()).await.is_ok());
        let Ok(ActivityEvent::ParticipantRegistered {
            current_participants,
            max_participants,
            ..
        }) = rx.recv().await
        else {
            panic!("expected registration activity");
        };
        assert_eq!((current_participants, max_participants), (1, 4));
    }

    #[tokio::test]
    async fn lock_table_only_tracks_live_events() {
        let h = Harness::new();
        let first = h.event_with_capacity(4).await;
        let second = h.event_with_capacity(4).await;
        let third = h.event_with_capacity(4).await;

        assert!(h.registrations.register(first, VolunteerId::new()).await.is_ok());
        assert!(h.registrations.register(second, VolunteerId::new()).await.is_ok());
        // the idle mutex of the first event is pruned on the next insert
        assert_eq!(h.registrations.tracked_events().await, 1);

        assert!(h.events.cancel_event(second).await.is_ok());
        assert_eq!(h.registrations.tracked_events().await, 0);

        let Ok(p) = h.registrations.register(third, VolunteerId::new()).await else {
            panic!("registration failed");
        };
        assert!(h.registrations.confirm(p.id).await.is_ok());
        assert_eq!(h.registrations.tracked_events().await, 1);
        h.clock.advance(chrono::Duration::days(2));
        assert!(h.sweeper.sweep().await.is_ok());
        assert_eq!(h.registrations.tracked_events().await, 0);
    }
}
