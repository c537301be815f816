//! Derived per-volunteer statistics.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use super::EventCategory;

/// Experience tier derived from credited hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VolunteerLevel {
    /// Fewer than 10 hours.
    Beginner,
    /// Fewer than 30 hours.
    Experienced,
    /// 30 hours or more.
    Expert,
}

impl VolunteerLevel {
    /// Tier for a given number of credited hours.
    #[must_use]
    pub const fn from_hours(hours: u64) -> Self {
        if hours < 10 {
            Self::Beginner
        } else if hours < 30 {
            Self::Experienced
        } else {
            Self::Expert
        }
    }
}

/// Statistics derived from the volunteer aggregate and participation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolunteerStats {
    /// Attendances credited (from the volunteer aggregate).
    pub total_events: u32,
    /// Hours credited (from the volunteer aggregate).
    pub total_hours: u64,
    /// Attended participations per category; every category is present.
    pub categories_participated: BTreeMap<EventCategory, u32>,
    /// Active participations in events that are still open.
    pub upcoming_events: u32,
    /// 1-based position among all volunteers by hours, descending.
    pub rank: u32,
    /// Tier derived from `total_hours`.
    pub level: VolunteerLevel,
}

/// A category map with every category present at zero.
#[must_use]
pub fn empty_category_counts() -> BTreeMap<EventCategory, u32> {
    EventCategory::ALL.into_iter().map(|c| (c, 0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_thresholds() {
        assert_eq!(VolunteerLevel::from_hours(0), VolunteerLevel::Beginner);
        assert_eq!(VolunteerLevel::from_hours(9), VolunteerLevel::Beginner);
        assert_eq!(VolunteerLevel::from_hours(10), VolunteerLevel::Experienced);
        assert_eq!(VolunteerLevel::from_hours(29), VolunteerLevel::Experienced);
        assert_eq!(VolunteerLevel::from_hours(30), VolunteerLevel::Expert);
    }

    #[test]
    fn empty_counts_cover_every_category() {
        let counts = empty_category_counts();
        assert_eq!(counts.len(), EventCategory::ALL.len());
        assert!(counts.values().all(|&n| n == 0));
    }
}
