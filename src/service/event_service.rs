//! Event service: organizer-side event management.

use std::sync::Arc;

use super::{NotificationService, RegistrationService};
use crate::domain::{
    ActivityEvent, Clock, Event, EventBus, EventFilter, EventId, EventPatch, EventStatus,
    NewEvent, NotificationKind, Participation, ParticipationFilter, ParticipationStatus,
};
use crate::error::HubError;
use crate::persistence::Store;

/// Creates, edits, cancels and deletes events.
///
/// Never writes `current_participants`; seat counts belong to
/// [`RegistrationService`].
#[derive(Debug, Clone)]
pub struct EventService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    notifications: NotificationService,
    registrations: Arc<RegistrationService>,
    event_bus: EventBus,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        notifications: NotificationService,
        registrations: Arc<RegistrationService>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            clock,
            notifications,
            registrations,
            event_bus,
        }
    }

    /// Publishes a new `upcoming` event.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] if the draft is invalid.
    pub async fn create_event(&self, draft: NewEvent) -> Result<Event, HubError> {
        let event = Event::create(draft, self.clock.now())?;
        self.store.insert_event(&event).await?;

        tracing::info!(event_id = %event.id, title = %event.title, max = event.max_participants, "event created");
        let _ = self.event_bus.publish(ActivityEvent::EventCreated {
            event_id: event.id,
            title: event.title.clone(),
            max_participants: event.max_participants,
            timestamp: event.created_at,
        });
        Ok(event)
    }

    /// Fetches one event.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] if it does not exist.
    pub async fn get_event(&self, id: EventId) -> Result<Event, HubError> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| HubError::not_found("event", id))
    }

    /// Lists events passing `filter`, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Store`] on persistence failure.
    pub async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, HubError> {
        Ok(self.store.list_events(filter).await?)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// [`HubError::NotFound`], [`HubError::InvalidRequest`] for an invalid
    /// merge, or [`HubError::Conflict`] if registrations grew past the new
    /// capacity in the meantime.
    pub async fn update_event(&self, id: EventId, patch: &EventPatch) -> Result<Event, HubError> {
        let mut event = self.get_event(id).await?;
        patch.apply(&mut event, self.clock.now())?;

        let Some(updated) = self.store.update_event_details(&event).await? else {
            // gone, or registrations overtook the new capacity
            self.get_event(id).await?;
            return Err(HubError::Conflict(
                "registrations changed while updating capacity".to_string(),
            ));
        };

        tracing::info!(event_id = %id, "event updated");
        let _ = self.event_bus.publish(ActivityEvent::EventUpdated {
            event_id: id,
            max_participants: updated.max_participants,
            timestamp: updated.updated_at,
        });
        Ok(updated)
    }

    /// Cancels an open event and tells every active registrant.
    ///
    /// # Errors
    ///
    /// [`HubError::NotFound`], or [`HubError::InvalidState`] if the event is
    /// already completed or cancelled.
    pub async fn cancel_event(&self, id: EventId) -> Result<Event, HubError> {
        let now = self.clock.now();
        let Some(event) = self
            .store
            .transition_event(
                id,
                &[EventStatus::Upcoming, EventStatus::Ongoing],
                EventStatus::Cancelled,
                now,
            )
            .await?
        else {
            let current = self.get_event(id).await?;
            return Err(HubError::InvalidState(format!(
                "event is already {}",
                current.status
            )));
        };

        tracing::info!(event_id = %id, "event cancelled");
        self.registrations.forget_event(id).await;
        self.notify_registrants(
            &event,
            "Event cancelled",
            &format!("\"{}\" has been cancelled by the organizer.", event.title),
        )
        .await;

        let _ = self.event_bus.publish(ActivityEvent::EventStatusChanged {
            event_id: id,
            status: EventStatus::Cancelled,
            credited_participations: 0,
            timestamp: now,
        });
        Ok(event)
    }

    /// Deletes an event together with all its participations.
    ///
    /// Returns the number of participations removed.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] if the event does not exist.
    pub async fn delete_event(&self, id: EventId) -> Result<u64, HubError> {
        let event = self.get_event(id).await?;
        let registrants = self.active_participations(id).await;

        let removed = self
            .store
            .delete_event(id)
            .await?
            .ok_or_else(|| HubError::not_found("event", id))?;
        self.registrations.forget_event(id).await;

        tracing::info!(event_id = %id, removed, "event deleted");
        let message = format!("\"{}\" has been removed.", event.title);
        for p in &registrants {
            self.notifications
                .notify(
                    p.volunteer_id.into(),
                    "Event removed",
                    &message,
                    NotificationKind::Event,
                    Some(id.into()),
                )
                .await;
        }

        let _ = self.event_bus.publish(ActivityEvent::EventDeleted {
            event_id: id,
            timestamp: self.clock.now(),
        });
        Ok(removed)
    }

    /// Lists the roster of an event, oldest registration first.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] if the event does not exist.
    pub async fn list_event_participations(
        &self,
        id: EventId,
    ) -> Result<Vec<Participation>, HubError> {
        self.get_event(id).await?;
        Ok(self
            .store
            .list_participations(&ParticipationFilter::for_event(id))
            .await?)
    }

    async fn active_participations(&self, id: EventId) -> Vec<Participation> {
        let filter = ParticipationFilter::for_event(id).with_statuses(&ParticipationStatus::ACTIVE);
        match self.store.list_participations(&filter).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(event_id = %id, error = %e, "could not load registrants to notify");
                Vec::new()
            }
        }
    }

    async fn notify_registrants(&self, event: &Event, title: &str, message: &str) {
        for p in self.active_participations(event.id).await {
            self.notifications
                .notify(
                    p.volunteer_id.into(),
                    title,
                    message,
                    NotificationKind::Event,
                    Some(event.id.into()),
                )
                .await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::VolunteerId;
    use crate::service::test_support::Harness;

    #[tokio::test]
    async fn cancelled_event_closes_registration() {
        let h = Harness::new();
        let event = h.event_with_capacity(3).await;
        let volunteer = h.volunteer("Ana").await;
        assert!(h.registrations.register(event, volunteer).await.is_ok());

        let Ok(cancelled) = h.events.cancel_event(event).await else {
            panic!("cancel failed");
        };
        assert_eq!(cancelled.status, EventStatus::Cancelled);
        assert!(matches!(
            h.registrations.register(event, VolunteerId::new()).await,
            Err(HubError::RegistrationClosed(_))
        ));
        assert!(matches!(
            h.events.cancel_event(event).await,
            Err(HubError::InvalidState(_))
        ));

        let Ok(inbox) = h.notifications.list(volunteer.into()).await else {
            panic!("list failed");
        };
        assert!(inbox.iter().any(|n| n.title == "Event cancelled"));
    }

    #[tokio::test]
    async fn delete_cascades_participations() {
        let h = Harness::new();
        let event = h.event_with_capacity(3).await;
        assert!(h.registrations.register(event, VolunteerId::new()).await.is_ok());
        assert!(h.registrations.register(event, VolunteerId::new()).await.is_ok());

        assert!(matches!(h.events.delete_event(event).await, Ok(2)));
        assert!(matches!(
            h.events.list_event_participations(event).await,
            Err(HubError::NotFound { .. })
        ));
        assert!(matches!(
            h.events.delete_event(event).await,
            Err(HubError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_cannot_drop_capacity_below_registrations() {
        let h = Harness::new();
        let event = h.event_with_capacity(3).await;
        assert!(h.registrations.register(event, VolunteerId::new()).await.is_ok());
        assert!(h.registrations.register(event, VolunteerId::new()).await.is_ok());

        let shrink = EventPatch {
            max_participants: Some(1),
            ..EventPatch::default()
        };
        assert!(matches!(
            h.events.update_event(event, &shrink).await,
            Err(HubError::InvalidRequest(_))
        ));

        let grow = EventPatch {
            max_participants: Some(5),
            title: Some("Bigger shift".to_string()),
            ..EventPatch::default()
        };
        let Ok(updated) = h.events.update_event(event, &grow).await else {
            panic!("update failed");
        };
        assert_eq!(updated.max_participants, 5);
        assert_eq!(updated.current_participants, 2);
        assert_eq!(updated.title, "Bigger shift");
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let h = Harness::new();
        let open = h.event_with_capacity(3).await;
        let closed = h.event_with_capacity(3).await;
        assert!(h.events.cancel_event(closed).await.is_ok());

        let filter = EventFilter {
            statuses: vec![EventStatus::Upcoming],
            ..EventFilter::default()
        };
        let Ok(events) = h.events.list_events(&filter).await else {
            panic!("list failed");
        };
        let ids: Vec<_> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![open]);
    }
}
