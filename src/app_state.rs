//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::chat::ChatRelay;
use crate::domain::{Clock, EventBus};
use crate::persistence::Store;
use crate::service::{
    CompletionSweeper, EventService, NotificationService, RegistrationService, StatsService,
    VolunteerService,
};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Organizer-side event management.
    pub events: Arc<EventService>,
    /// Seat allocation and participation transitions.
    pub registrations: Arc<RegistrationService>,
    /// Volunteer profiles.
    pub volunteers: Arc<VolunteerService>,
    /// Per-user notifications.
    pub notifications: Arc<NotificationService>,
    /// Completion reconciliation.
    pub sweeper: Arc<CompletionSweeper>,
    /// Derived volunteer statistics.
    pub stats: Arc<StatsService>,
    /// Chat relay in front of the upstream completion API.
    pub chat: Arc<ChatRelay>,
    /// Activity bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires every service over one store and clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
        chat: ChatRelay,
    ) -> Self {
        let notifications = NotificationService::new(Arc::clone(&store), Arc::clone(&clock));
        let registrations = Arc::new(RegistrationService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            notifications.clone(),
            event_bus.clone(),
        ));
        let events = EventService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            notifications.clone(),
            Arc::clone(&registrations),
            event_bus.clone(),
        );
        let sweeper = Arc::new(CompletionSweeper::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&registrations),
            event_bus.clone(),
        ));
        let stats = StatsService::new(Arc::clone(&store), Arc::clone(&sweeper));
        let volunteers = VolunteerService::new(store, clock);

        Self {
            events: Arc::new(events),
            registrations,
            volunteers: Arc::new(volunteers),
            notifications: Arc::new(notifications),
            sweeper,
            stats: Arc::new(stats),
            chat: Arc::new(chat),
            event_bus,
        }
    }
}
