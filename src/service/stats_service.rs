//! Stats service: per-volunteer statistics and ranking.

use std::collections::HashMap;
use std::sync::Arc;

use super::CompletionSweeper;
use crate::domain::stats::empty_category_counts;
use crate::domain::{
    Event, EventId, Participation, ParticipationFilter, ParticipationStatus, VolunteerId,
    VolunteerLevel, VolunteerStats,
};
use crate::error::HubError;
use crate::persistence::{Store, StoreError};

/// Derives [`VolunteerStats`].
///
/// Totals come from the volunteer aggregate, never from recounting
/// participations. Secondary data (history scan, ranking) degrades to
/// defaults instead of failing the call.
#[derive(Debug, Clone)]
pub struct StatsService {
    store: Arc<dyn Store>,
    sweeper: Arc<CompletionSweeper>,
}

impl StatsService {
    /// Creates a new `StatsService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, sweeper: Arc<CompletionSweeper>) -> Self {
        Self { store, sweeper }
    }

    /// Statistics for one volunteer.
    ///
    /// Runs a completion sweep first so recently ended events are credited.
    ///
    /// # Errors
    ///
    /// [`HubError::NotFound`] if the volunteer has no profile, or
    /// [`HubError::Store`] if the profile itself cannot be read.
    pub async fn get_stats(&self, volunteer_id: VolunteerId) -> Result<VolunteerStats, HubError> {
        if let Err(e) = self.sweeper.sweep().await {
            tracing::warn!(error = %e, "pre-stats sweep failed");
        }

        let volunteer = self
            .store
            .get_volunteer(volunteer_id)
            .await?
            .ok_or_else(|| HubError::not_found("volunteer", volunteer_id))?;

        let (participations, events) = match self.history(volunteer_id).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(%volunteer_id, error = %e, "participation history unavailable, using zeroes");
                (Vec::new(), HashMap::new())
            }
        };

        let mut categories = empty_category_counts();
        let mut upcoming_events = 0;
        for p in &participations {
            let Some(event) = events.get(&p.event_id) else {
                continue;
            };
            if p.status.is_active() && event.status.is_open() {
                upcoming_events += 1;
            }
            if p.status == ParticipationStatus::Attended {
                *categories.entry(event.category).or_insert(0) += 1;
            }
        }

        let rank = match self.rank_of(volunteer_id).await {
            Ok(Some(rank)) => rank,
            Ok(None) => 1,
            Err(e) => {
                tracing::warn!(%volunteer_id, error = %e, "ranking unavailable, defaulting to 1");
                1
            }
        };

        Ok(VolunteerStats {
            total_events: volunteer.events_attended,
            total_hours: volunteer.total_hours,
            categories_participated: categories,
            upcoming_events,
            rank,
            level: VolunteerLevel::from_hours(volunteer.total_hours),
        })
    }

    /// 1-based position of a volunteer among all volunteers ordered by hours
    /// descending; `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the ordering cannot be read.
    pub async fn rank_of(&self, volunteer_id: VolunteerId) -> Result<Option<u32>, StoreError> {
        let ordered = self.store.list_volunteers_by_hours().await?;
        Ok(ordered
            .iter()
            .position(|v| v.id == volunteer_id)
            .map(|index| u32::try_from(index + 1).unwrap_or(u32::MAX)))
    }

    async fn history(
        &self,
        volunteer_id: VolunteerId,
    ) -> Result<(Vec<Participation>, HashMap<EventId, Event>), StoreError> {
        let participations = self
            .store
            .list_participations(&ParticipationFilter::for_volunteer(volunteer_id))
            .await?;
        let mut ids: Vec<EventId> = participations.iter().map(|p| p.event_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let events = self
            .store
            .get_events(&ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        Ok((participations, events))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::EventCategory;
    use crate::service::test_support::Harness;

    #[tokio::test]
    async fn newcomer_has_zeroed_stats() {
        let h = Harness::new();
        let volunteer = h.volunteer("Ana").await;

        let Ok(stats) = h.stats.get_stats(volunteer).await else {
            panic!("stats failed");
        };
        assert_eq!(stats.total_hours, 0);
        assert_eq!(stats.total_events, 0);
        assert_eq!(stats.level, VolunteerLevel::Beginner);
        assert_eq!(stats.upcoming_events, 0);
        assert_eq!(stats.categories_participated.len(), EventCategory::ALL.len());
        assert!(stats.categories_participated.values().all(|&n| n == 0));
        assert_eq!(stats.rank, 1);
    }

    #[tokio::test]
    async fn stats_reflect_sweep_and_rank() {
        let h = Harness::new();
        let event = h.event_with_hours(12).await;
        let other = h.event_with_hours(3).await;
        let ana = h.volunteer("Ana").await;
        let ben = h.volunteer("Ben").await;

        let Ok(p) = h.registrations.register(event, ana).await else {
            panic!("registration failed");
        };
        assert!(h.registrations.confirm(p.id).await.is_ok());
        assert!(h.registrations.register(other, ben).await.is_ok());
        h.clock.advance(chrono::Duration::days(3));

        // the read sweeps first
        let Ok(stats) = h.stats.get_stats(ana).await else {
            panic!("stats failed");
        };
        assert_eq!(stats.total_hours, 12);
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.level, VolunteerLevel::Experienced);
        assert_eq!(stats.rank, 1);
        assert_eq!(
            stats.categories_participated.get(&EventCategory::Community),
            Some(&1)
        );

        let Ok(ben_stats) = h.stats.get_stats(ben).await else {
            panic!("stats failed");
        };
        assert_eq!(ben_stats.rank, 2);
        assert_eq!(ben_stats.upcoming_events, 0);
    }

    #[tokio::test]
    async fn ranking_failure_still_returns_stats_with_rank_one() {
        let h = Harness::new();
        let event = h.event_with_hours(6).await;
        let leader = h.volunteer("Ana").await;
        let ben = h.volunteer("Ben").await;
        for volunteer in [leader, ben] {
            let Ok(p) = h.registrations.register(event, volunteer).await else {
                panic!("registration failed");
            };
            assert!(h.registrations.confirm(p.id).await.is_ok());
        }
        h.clock.advance(chrono::Duration::days(2));
        h.store.inject_ranking_fault().await;

        let Ok(stats) = h.stats.get_stats(ben).await else {
            panic!("stats failed despite degraded ranking");
        };
        assert_eq!(stats.rank, 1);
        assert_eq!(stats.total_hours, 6);
        assert_eq!(stats.total_events, 1);
        assert_eq!(
            stats.categories_participated.get(&EventCategory::Community),
            Some(&1)
        );
    }

    #[tokio::test]
    async fn history_failure_zeroes_counts_but_keeps_totals() {
        let h = Harness::new();
        let past = h.event_with_hours(5).await;
        let ana = h.volunteer("Ana").await;
        let Ok(p) = h.registrations.register(past, ana).await else {
            panic!("registration failed");
        };
        assert!(h.registrations.confirm(p.id).await.is_ok());
        h.clock.advance(chrono::Duration::days(2));
        assert!(h.sweeper.sweep().await.is_ok());

        let upcoming = h.event_with_capacity(4).await;
        assert!(h.registrations.register(upcoming, ana).await.is_ok());
        h.store.inject_history_fault(ana).await;

        let Ok(stats) = h.stats.get_stats(ana).await else {
            panic!("stats failed despite degraded history");
        };
        assert_eq!(stats.total_hours, 5);
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.upcoming_events, 0);
        assert!(stats.categories_participated.values().all(|&n| n == 0));
        assert_eq!(stats.categories_participated.len(), EventCategory::ALL.len());
        assert_eq!(stats.rank, 1);
    }

    #[tokio::test]
    async fn active_registration_counts_as_upcoming() {
        let h = Harness::new();
        let event = h.event_with_capacity(4).await;
        let ana = h.volunteer("Ana").await;
        assert!(h.registrations.register(event, ana).await.is_ok());

        let Ok(stats) = h.stats.get_stats(ana).await else {
            panic!("stats failed");
        };
        assert_eq!(stats.upcoming_events, 1);
    }

    #[tokio::test]
    async fn unknown_volunteer_is_not_found() {
        let h = Harness::new();
        assert!(matches!(
            h.stats.get_stats(VolunteerId::new()).await,
            Err(HubError::NotFound { .. })
        ));
    }
}
