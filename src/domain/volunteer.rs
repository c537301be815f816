//! Volunteer profiles and their attendance aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VolunteerId;
use crate::error::HubError;

/// A volunteer profile.
///
/// `total_hours` and `events_attended` are running aggregates credited by
/// attendance recording. They are the authoritative source for statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volunteer {
    /// Volunteer identifier (shared with the identity provider).
    pub id: VolunteerId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Hours credited so far.
    pub total_hours: u64,
    /// Attendances credited so far.
    pub events_attended: u32,
    /// Profile creation timestamp.
    pub joined_at: DateTime<Utc>,
}

impl Volunteer {
    /// Creates a profile with zeroed aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] for a blank name or an email
    /// without `@`.
    pub fn create(
        id: VolunteerId,
        name: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, HubError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(HubError::InvalidRequest("name must not be empty".to_string()));
        }
        if !email.contains('@') {
            return Err(HubError::InvalidRequest(format!("invalid email: {email}")));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            total_hours: 0,
            events_attended: 0,
            joined_at: now,
        })
    }

    /// Adds one attendance worth `hours`.
    pub fn credit(&mut self, hours: u32) {
        self.total_hours = self.total_hours.saturating_add(u64::from(hours));
        self.events_attended = self.events_attended.saturating_add(1);
    }
}
