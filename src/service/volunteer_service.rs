//! Volunteer profiles and their participation history.

use std::sync::Arc;

use crate::domain::{Clock, Participation, ParticipationFilter, Volunteer, VolunteerId};
use crate::error::HubError;
use crate::persistence::{Store, StoreError};

/// Creates and reads volunteer profiles.
#[derive(Debug, Clone)]
pub struct VolunteerService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl VolunteerService {
    /// Creates a new `VolunteerService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a profile with zeroed aggregates.
    ///
    /// `id` is the identity provider's user id when known; a fresh id is
    /// generated otherwise.
    ///
    /// # Errors
    ///
    /// [`HubError::InvalidRequest`] for a blank name or malformed email,
    /// [`HubError::Conflict`] if the id already has a profile.
    pub async fn create_volunteer(
        &self,
        id: Option<VolunteerId>,
        name: &str,
        email: &str,
    ) -> Result<Volunteer, HubError> {
        let volunteer = Volunteer::create(id.unwrap_or_default(), name, email, self.clock.now())?;
        match self.store.insert_volunteer(&volunteer).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(HubError::Conflict(format!(
                    "volunteer {} already exists",
                    volunteer.id
                )));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(volunteer_id = %volunteer.id, "volunteer profile created");
        Ok(volunteer)
    }

    /// Fetches one profile.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] if it does not exist.
    pub async fn get_volunteer(&self, id: VolunteerId) -> Result<Volunteer, HubError> {
        self.store
            .get_volunteer(id)
            .await?
            .ok_or_else(|| HubError::not_found("volunteer", id))
    }

    /// Lists every participation of a volunteer, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Store`] on persistence failure.
    pub async fn list_volunteer_participations(
        &self,
        id: VolunteerId,
    ) -> Result<Vec<Participation>, HubError> {
        Ok(self
            .store
            .list_participations(&ParticipationFilter::for_volunteer(id))
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SystemClock;
    use crate::persistence::MemoryStore;

    #[tokio::test]
    async fn duplicate_profile_is_a_conflict() {
        let service = VolunteerService::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
        let id = VolunteerId::new();
        let Ok(created) = service
            .create_volunteer(Some(id), "Ana", "ana@example.org")
            .await
        else {
            panic!("create failed");
        };
        assert_eq!(created.total_hours, 0);
        assert!(matches!(
            service.create_volunteer(Some(id), "Ana", "ana@example.org").await,
            Err(HubError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let service = VolunteerService::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
        assert!(matches!(
            service.create_volunteer(None, "Ana", "nope").await,
            Err(HubError::InvalidRequest(_))
        ));
    }
}
