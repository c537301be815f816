//! Service layer: business logic orchestration.
//!
//! [`RegistrationService`] owns seat booking and the participation
//! lifecycle, [`CompletionSweeper`] reconciles ended events, and
//! [`StatsService`] derives per-volunteer statistics. Every mutation emits
//! activity through the [`super::domain::EventBus`].

pub mod completion_sweeper;
pub mod event_service;
pub mod notification_service;
pub mod registration_service;
pub mod stats_service;
pub mod volunteer_service;

pub use completion_sweeper::{CompletionSweeper, SweepReport};
pub use event_service::EventService;
pub use notification_service::NotificationService;
pub use registration_service::RegistrationService;
pub use stats_service::StatsService;
pub use volunteer_service::VolunteerService;
