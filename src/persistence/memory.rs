//! Process-local store.
//!
//! [`MemoryStore`] keeps every table in one struct behind a
//! [`tokio::sync::RwLock`]. Reads share the lock; each write, including the
//! cross-entity ledger units, runs under a single write guard and is
//! therefore atomic. Per-event serialization of registration decisions is
//! layered on top by the registration service.

use std::collections::HashMap;
#[cfg(test)]
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    AttendanceOutcome, EnrollOutcome, EventStore, LedgerStore, NotificationStore,
    ParticipationStore, ReleaseOutcome, StoreError, TransitionOutcome, VolunteerStore,
};
use crate::domain::{
    Event, EventFilter, EventId, EventStatus, Notification, NotificationId, Participation,
    ParticipationFilter, ParticipationId, ParticipationStatus, Volunteer, VolunteerId,
};

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    participations: HashMap<ParticipationId, Participation>,
    volunteers: HashMap<VolunteerId, Volunteer>,
    volunteer_order: Vec<VolunteerId>,
    notifications: Vec<Notification>,
    #[cfg(test)]
    failing_events: HashSet<EventId>,
    #[cfg(test)]
    failing_histories: HashSet<VolunteerId>,
    #[cfg(test)]
    ranking_unavailable: bool,
}

impl Tables {
    #[cfg(test)]
    fn check_fault(&self, id: EventId) -> Result<(), StoreError> {
        if self.failing_events.contains(&id) {
            return Err(StoreError::Unavailable(format!("injected fault for {id}")));
        }
        Ok(())
    }

    #[cfg(test)]
    fn check_history_fault(&self, id: VolunteerId) -> Result<(), StoreError> {
        if self.failing_histories.contains(&id) {
            return Err(StoreError::Unavailable(format!("injected history fault for {id}")));
        }
        Ok(())
    }

    #[cfg(test)]
    fn check_ranking_fault(&self) -> Result<(), StoreError> {
        if self.ranking_unavailable {
            return Err(StoreError::Unavailable("injected ranking fault".to_string()));
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[allow(clippy::unused_self, clippy::missing_const_for_fn)]
    fn check_fault(&self, _id: EventId) -> Result<(), StoreError> {
        Ok(())
    }

    #[cfg(not(test))]
    #[allow(clippy::unused_self, clippy::missing_const_for_fn)]
    fn check_history_fault(&self, _id: VolunteerId) -> Result<(), StoreError> {
        Ok(())
    }

    #[cfg(not(test))]
    #[allow(clippy::unused_self, clippy::missing_const_for_fn)]
    fn check_ranking_fault(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn has_active_participation(&self, event_id: EventId, volunteer_id: VolunteerId) -> bool {
        self.participations.values().any(|p| {
            p.event_id == event_id && p.volunteer_id == volunteer_id && p.status.is_active()
        })
    }
}

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every event-scoped operation on `id` fail until cleared.
    #[cfg(test)]
    pub(crate) async fn inject_event_fault(&self, id: EventId) {
        self.tables.write().await.failing_events.insert(id);
    }

    /// Clears a fault injected with [`Self::inject_event_fault`].
    #[cfg(test)]
    pub(crate) async fn clear_event_fault(&self, id: EventId) {
        self.tables.write().await.failing_events.remove(&id);
    }

    /// Makes participation listings scoped to `id` fail.
    #[cfg(test)]
    pub(crate) async fn inject_history_fault(&self, id: VolunteerId) {
        self.tables.write().await.failing_histories.insert(id);
    }

    /// Makes the hours ranking unreadable.
    #[cfg(test)]
    pub(crate) async fn inject_ranking_fault(&self) {
        self.tables.write().await.ranking_unavailable = true;
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let tables = self.tables.read().await;
        tables.check_fault(id)?;
        Ok(tables.events.get(&id).cloned())
    }

    async fn get_events(&self, ids: &[EventId]) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.events.get(id).cloned())
            .collect())
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            return Err(StoreError::Duplicate(format!("event {}", event.id)));
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event_details(&self, event: &Event) -> Result<Option<Event>, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_fault(event.id)?;
        let Some(stored) = tables.events.get_mut(&event.id) else {
            return Ok(None);
        };
        if event.max_participants < stored.current_participants {
            return Ok(None);
        }
        stored.title.clone_from(&event.title);
        stored.description.clone_from(&event.description);
        stored.location.clone_from(&event.location);
        stored.start_time = event.start_time;
        stored.end_time = event.end_time;
        stored.max_participants = event.max_participants;
        stored.category = event.category;
        stored.hours = event.hours;
        stored.updated_at = event.updated_at;
        Ok(Some(stored.clone()))
    }

    async fn transition_event(
        &self,
        id: EventId,
        from: &[EventStatus],
        to: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_fault(id)?;
        let Some(event) = tables.events.get_mut(&id) else {
            return Ok(None);
        };
        if !from.contains(&event.status) {
            return Ok(None);
        }
        event.status = to;
        event.updated_at = now;
        Ok(Some(event.clone()))
    }

    async fn delete_event(&self, id: EventId) -> Result<Option<u64>, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_fault(id)?;
        if tables.events.remove(&id).is_none() {
            return Ok(None);
        }
        let before = tables.participations.len();
        tables.participations.retain(|_, p| p.event_id != id);
        Ok(Some((before - tables.participations.len()) as u64))
    }
}

#[async_trait]
impl ParticipationStore for MemoryStore {
    async fn get_participation(
        &self,
        id: ParticipationId,
    ) -> Result<Option<Participation>, StoreError> {
        Ok(self.tables.read().await.participations.get(&id).cloned())
    }

    async fn list_participations(
        &self,
        filter: &ParticipationFilter,
    ) -> Result<Vec<Participation>, StoreError> {
        let tables = self.tables.read().await;
        if let Some(event_id) = filter.event_id {
            tables.check_fault(event_id)?;
        }
        if let Some(volunteer_id) = filter.volunteer_id {
            tables.check_history_fault(volunteer_id)?;
        }
        let mut rows: Vec<Participation> = tables
            .participations
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn transition_participation(
        &self,
        id: ParticipationId,
        from: &[ParticipationStatus],
        to: ParticipationStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(participation) = tables.participations.get_mut(&id) else {
            return Ok(TransitionOutcome::Missing);
        };
        if !from.contains(&participation.status) {
            return Ok(TransitionOutcome::Rejected(participation.status));
        }
        participation.status = to;
        participation.updated_at = now;
        Ok(TransitionOutcome::Applied(participation.clone()))
    }
}

#[async_trait]
impl VolunteerStore for MemoryStore {
    async fn get_volunteer(&self, id: VolunteerId) -> Result<Option<Volunteer>, StoreError> {
        Ok(self.tables.read().await.volunteers.get(&id).cloned())
    }

    async fn insert_volunteer(&self, volunteer: &Volunteer) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.volunteers.contains_key(&volunteer.id) {
            return Err(StoreError::Duplicate(format!("volunteer {}", volunteer.id)));
        }
        tables.volunteers.insert(volunteer.id, volunteer.clone());
        tables.volunteer_order.push(volunteer.id);
        Ok(())
    }

    async fn list_volunteers_by_hours(&self) -> Result<Vec<Volunteer>, StoreError> {
        let tables = self.tables.read().await;
        tables.check_ranking_fault()?;
        let mut volunteers: Vec<Volunteer> = tables
            .volunteer_order
            .iter()
            .filter_map(|id| tables.volunteers.get(id).cloned())
            .collect();
        // stable: ties keep creation order
        volunteers.sort_by(|a, b| b.total_hours.cmp(&a.total_hours));
        Ok(volunteers)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: uuid::Uuid,
    ) -> Result<Vec<Notification>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(notification) = tables.notifications.iter_mut().find(|n| n.id == id) else {
            return Ok(false);
        };
        notification.read = true;
        Ok(true)
    }

    async fn mark_all_notifications_read(&self, user_id: uuid::Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for notification in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            notification.read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn enroll(&self, participation: &Participation) -> Result<EnrollOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_fault(participation.event_id)?;
        if tables.has_active_participation(participation.event_id, participation.volunteer_id) {
            return Err(StoreError::Duplicate(format!(
                "active participation for volunteer {} in event {}",
                participation.volunteer_id, participation.event_id
            )));
        }
        let Some(event) = tables.events.get_mut(&participation.event_id) else {
            return Ok(EnrollOutcome::EventMissing);
        };
        if event.current_participants >= event.max_participants {
            return Ok(EnrollOutcome::Full);
        }
        event.current_participants += 1;
        let event = event.clone();
        tables
            .participations
            .insert(participation.id, participation.clone());
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
        let mut tables = self.tables.write().await;
        let Some(participation) = tables.participations.get_mut(&id) else {
            return Ok(ReleaseOutcome::Missing);
        };
        if !participation.status.is_active() || !participation.status.can_transition_to(to) {
            return Ok(ReleaseOutcome::Rejected(participation.status));
        }
        participation.status = to;
        participation.updated_at = now;
        let participation = participation.clone();

        let current_participants = match tables.events.get_mut(&participation.event_id) {
            Some(event) => {
                event.current_participants = event.current_participants.saturating_sub(1);
                event.current_participants
            }
            None => 0,
        };
        Ok(ReleaseOutcome::Released {
            participation,
            current_participants,
        })
    }

    async fn record_attendance(
        &self,
        id: ParticipationId,
        hours_logged: u32,
        now: DateTime<Utc>,
    ) -> Result<AttendanceOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(participation) = tables.participations.get(&id) else {
            return Ok(AttendanceOutcome::Missing);
        };
        tables.check_fault(participation.event_id)?;
        if !participation.status.is_active() {
            return Ok(AttendanceOutcome::Rejected(participation.status));
        }
        let volunteer_id = participation.volunteer_id;
        let Some(volunteer) = tables.volunteers.get_mut(&volunteer_id) else {
            return Ok(AttendanceOutcome::VolunteerMissing(volunteer_id));
        };
        volunteer.credit(hours_logged);

        let Some(participation) = tables.participations.get_mut(&id) else {
            return Ok(AttendanceOutcome::Missing);
        };
        participation.status = ParticipationStatus::Attended;
        participation.hours_logged = hours_logged;
        participation.updated_at = now;
        Ok(AttendanceOutcome::Recorded(participation.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{EventCategory, NewEvent};

    fn event(max: u32) -> Event {
        let now = Utc::now();
        let draft = NewEvent {
            title: "Food bank shift".to_string(),
            description: String::new(),
            location: String::new(),
            start_time: now + Duration::days(2),
            end_time: now + Duration::days(2) + Duration::hours(4),
            max_participants: max,
            category: EventCategory::Community,
            hours: 4,
            organizer_id: uuid::Uuid::new_v4(),
        };
        let Ok(event) = Event::create(draft, now) else {
            panic!("valid draft rejected");
        };
        event
    }

    #[tokio::test]
    async fn enroll_respects_capacity() {
        let store = MemoryStore::new();
        let event = event(1);
        let _ = store.insert_event(&event).await;

        let first = Participation::registered(event.id, VolunteerId::new(), Utc::now());
        let second = Participation::registered(event.id, VolunteerId::new(), Utc::now());

        let Ok(EnrollOutcome::Enrolled { event: after, .. }) = store.enroll(&first).await else {
            panic!("first enroll should succeed");
        };
        assert_eq!(after.current_participants, 1);
        assert!(matches!(store.enroll(&second).await, Ok(EnrollOutcome::Full)));
        assert!(matches!(
            store.get_participation(second.id).await,
            Ok(None)
        ));
    }

    #[tokio::test]
    async fn enroll_rejects_second_active_record() {
        let store = MemoryStore::new();
        let event = event(5);
        let _ = store.insert_event(&event).await;
        let volunteer = VolunteerId::new();

        let _ = store
            .enroll(&Participation::registered(event.id, volunteer, Utc::now()))
            .await;
        let again = store
            .enroll(&Participation::registered(event.id, volunteer, Utc::now()))
            .await;
        assert!(matches!(again, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn release_clamps_at_zero() {
        let store = MemoryStore::new();
        let event = event(2);
        let _ = store.insert_event(&event).await;
        let p = Participation::registered(event.id, VolunteerId::new(), Utc::now());
        let _ = store.enroll(&p).await;

        // simulate counter drift
        if let Some(e) = store.tables.write().await.events.get_mut(&event.id) {
            e.current_participants = 0;
        }

        let Ok(ReleaseOutcome::Released {
            current_participants,
            ..
        }) = store
            .release(p.id, ParticipationStatus::Cancelled, Utc::now())
            .await
        else {
            panic!("release should apply");
        };
        assert_eq!(current_participants, 0);
    }

    #[tokio::test]
    async fn record_attendance_is_not_repeated() {
        let store = MemoryStore::new();
        let event = event(2);
        let _ = store.insert_event(&event).await;
        let Ok(volunteer) = Volunteer::create(VolunteerId::new(), "Ana", "ana@example.org", Utc::now())
        else {
            panic!("valid volunteer rejected");
        };
        let _ = store.insert_volunteer(&volunteer).await;
        let p = Participation::registered(event.id, volunteer.id, Utc::now());
        let _ = store.enroll(&p).await;

        let first = store.record_attendance(p.id, 4, Utc::now()).await;
        assert!(matches!(first, Ok(AttendanceOutcome::Recorded(_))));
        let second = store.record_attendance(p.id, 4, Utc::now()).await;
        assert!(matches!(
            second,
            Ok(AttendanceOutcome::Rejected(ParticipationStatus::Attended))
        ));

        let Ok(Some(after)) = store.get_volunteer(volunteer.id).await else {
            panic!("volunteer vanished");
        };
        assert_eq!(after.total_hours, 4);
        assert_eq!(after.events_attended, 1);
    }

    #[tokio::test]
    async fn record_attendance_without_profile_writes_nothing() {
        let store = MemoryStore::new();
        let event = event(2);
        let _ = store.insert_event(&event).await;
        let p = Participation::registered(event.id, VolunteerId::new(), Utc::now());
        let _ = store.enroll(&p).await;

        let outcome = store.record_attendance(p.id, 4, Utc::now()).await;
        assert!(matches!(outcome, Ok(AttendanceOutcome::VolunteerMissing(_))));
        let Ok(Some(unchanged)) = store.get_participation(p.id).await else {
            panic!("participation vanished");
        };
        assert_eq!(unchanged.status, ParticipationStatus::Registered);
    }

    #[tokio::test]
    async fn delete_event_cascades() {
        let store = MemoryStore::new();
        let event = event(3);
        let _ = store.insert_event(&event).await;
        for _ in 0..2 {
            let _ = store
                .enroll(&Participation::registered(
                    event.id,
                    VolunteerId::new(),
                    Utc::now(),
                ))
                .await;
        }
        assert!(matches!(store.delete_event(event.id).await, Ok(Some(2))));
        let Ok(rest) = store
            .list_participations(&ParticipationFilter::for_event(event.id))
            .await
        else {
            panic!("list failed");
        };
        assert!(rest.is_empty());
        assert!(matches!(store.delete_event(event.id).await, Ok(None)));
    }

    #[tokio::test]
    async fn volunteers_rank_stably_by_hours() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for (name, hours) in [("a", 5u32), ("b", 12), ("c", 5)] {
            let Ok(mut v) =
                Volunteer::create(VolunteerId::new(), name, "x@example.org", Utc::now())
            else {
                panic!("valid volunteer rejected");
            };
            v.credit(hours);
            ids.push(v.id);
            let _ = store.insert_volunteer(&v).await;
        }
        let Ok(ordered) = store.list_volunteers_by_hours().await else {
            panic!("list failed");
        };
        let order: Vec<_> = ordered.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
    }
}
