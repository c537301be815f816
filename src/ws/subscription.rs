//! Per-connection subscription manager.
//!
//! Tracks which events a WebSocket client follows and filters activity
//! server-side.

use std::collections::HashSet;

use crate::domain::EventId;

/// Wildcard token following every event.
pub const WILDCARD: &str = "*";

/// Manages the set of event subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Followed event IDs. Ignored while `subscribe_all` is set.
    event_ids: HashSet<EventId>,
    /// Whether the client follows every event.
    subscribe_all: bool,
}

/// Event IDs parsed from a command, with invalid entries kept apart.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedIds {
    /// Valid event IDs.
    pub ids: Vec<EventId>,
    /// `"*"` was present.
    pub wildcard: bool,
    /// Entries that are neither a UUID nor `"*"`.
    pub rejected: Vec<String>,
}

impl ParsedIds {
    /// Parses raw ID strings.
    #[must_use]
    pub fn parse(raw: &[String]) -> Self {
        let mut parsed = Self::default();
        for s in raw {
            if s == WILDCARD {
                parsed.wildcard = true;
            } else if let Ok(uuid) = s.parse::<uuid::Uuid>() {
                parsed.ids.push(EventId::from_uuid(uuid));
            } else {
                parsed.rejected.push(s.clone());
            }
        }
        parsed
    }
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows the given events; `wildcard` follows all of them.
    pub fn subscribe(&mut self, ids: &[EventId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.event_ids.extend(ids.iter().copied());
    }

    /// Stops following the given events; `wildcard` clears the wildcard.
    pub fn unsubscribe(&mut self, ids: &[EventId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for id in ids {
            self.event_ids.remove(id);
        }
    }

    /// Returns `true` if activity for `event_id` should be forwarded.
    #[must_use]
    pub fn matches(&self, event_id: EventId) -> bool {
        self.subscribe_all || self.event_ids.contains(&event_id)
    }

    /// Number of explicitly followed events.
    #[must_use]
    pub fn count(&self) -> usize {
        self.event_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub const fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
