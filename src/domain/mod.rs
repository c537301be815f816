//! Domain layer: events, participations, volunteers, derived statistics,
//! notifications, activity broadcasting and time.

pub mod activity;
pub mod clock;
pub mod event;
pub mod event_bus;
pub mod ids;
pub mod notification;
pub mod participation;
pub mod stats;
pub mod volunteer;

pub use activity::ActivityEvent;
pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{
    Event, EventCategory, EventFilter, EventPatch, EventStatus, MAX_COUNT, NewEvent,
};
pub use event_bus::EventBus;
pub use ids::{EventId, NotificationId, ParticipationId, VolunteerId};
pub use notification::{Notification, NotificationKind};
pub use participation::{Participation, ParticipationFilter, ParticipationStatus};
pub use stats::{VolunteerLevel, VolunteerStats};
pub use volunteer::Volunteer;
