//! Completion sweeper: closes ended events and credits confirmed attendance.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

use super::RegistrationService;
use crate::domain::{
    ActivityEvent, Clock, Event, EventBus, EventFilter, EventId, EventStatus, ParticipationFilter,
    ParticipationStatus,
};
use crate::error::HubError;
use crate::persistence::Store;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Ended events found still open.
    pub examined: u32,
    /// Events moved to `completed`.
    pub completed: u32,
    /// Participations credited across all events.
    pub credited_participations: u32,
    /// Events that failed and stay open for the next sweep.
    #[schema(value_type = Vec<String>)]
    pub failed: Vec<EventId>,
}

/// Reconciles time-based state: every open event whose end has passed is
/// completed, and its `confirmed` participations are credited with the
/// event's hours.
///
/// Confirmed participations are credited before the event is completed.
/// If crediting fails partway the event stays open, and the next sweep only
/// sees the participations still `confirmed`, so a sweep can be repeated any
/// number of times without crediting anyone twice.
#[derive(Debug)]
pub struct CompletionSweeper {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    registrations: Arc<RegistrationService>,
    event_bus: EventBus,
    running: Mutex<()>,
}

impl CompletionSweeper {
    /// Creates a new `CompletionSweeper`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        registrations: Arc<RegistrationService>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            clock,
            registrations,
            event_bus,
            running: Mutex::new(()),
        }
    }

    /// Runs one sweep. Concurrent calls queue behind each other.
    ///
    /// A failure on one event is logged and recorded in the report; the
    /// remaining events are still processed.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Store`] only if the ended events cannot be listed.
    pub async fn sweep(&self) -> Result<SweepReport, HubError> {
        let _running = self.running.lock().await;
        let now = self.clock.now();
        let ended = self
            .store
            .list_events(&EventFilter {
                statuses: vec![EventStatus::Upcoming, EventStatus::Ongoing],
                category: None,
                ends_before: Some(now),
            })
            .await?;

        let mut report = SweepReport::default();
        for event in &ended {
            report.examined += 1;
            match self.complete(event).await {
                Ok(Some(credited)) => {
                    report.completed += 1;
                    report.credited_participations += credited;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(event_id = %event.id, error = %e, "sweep failed for event, will retry");
                    report.failed.push(event.id);
                }
            }
        }

        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                completed = report.completed,
                credited = report.credited_participations,
                failed = report.failed.len(),
                "completion sweep finished"
            );
        }
        Ok(report)
    }

    /// Spawns a background task sweeping every `interval`.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::error!(error = %e, "completion sweep failed");
                }
            }
        })
    }

    /// Credits and completes one event. `None` when another writer closed it
    /// first.
    async fn complete(&self, event: &Event) -> Result<Option<u32>, HubError> {
        let confirmed = self
            .store
            .list_participations(
                &ParticipationFilter::for_event(event.id)
                    .with_statuses(&[ParticipationStatus::Confirmed]),
            )
            .await?;

        let mut credited = 0;
        for p in &confirmed {
            match self.registrations.mark_attended(p.id, event.hours).await {
                Ok(_) => credited += 1,
                // cancelled or credited since the read
                Err(
                    HubError::InvalidState(_)
                    | HubError::NotFound {
                        entity: "participation",
                        ..
                    },
                ) => {
                    tracing::debug!(participation_id = %p.id, "participation changed during sweep, skipped");
                }
                Err(HubError::NotFound { entity: "volunteer", id }) => {
                    tracing::warn!(participation_id = %p.id, volunteer_id = %id, "no volunteer profile, hours not credited");
                }
                Err(e) => return Err(e),
            }
        }

        let now = self.clock.now();
        let Some(_) = self
            .store
            .transition_event(
                event.id,
                &[EventStatus::Upcoming, EventStatus::Ongoing],
                EventStatus::Completed,
                now,
            )
            .await?
        else {
            return Ok(None);
        };

        tracing::info!(event_id = %event.id, credited, "event completed");
        self.registrations.forget_event(event.id).await;
        let _ = self.event_bus.publish(ActivityEvent::EventStatusChanged {
            event_id: event.id,
            status: EventStatus::Completed,
            credited_participations: credited,
            timestamp: now,
        });
        Ok(Some(credited))
    }
}
