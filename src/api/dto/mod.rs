//! Data Transfer Objects for REST request/response serialization.
//!
//! Identifiers are exposed as plain UUIDs; domain types convert into their
//! DTOs with `From`.

pub mod chat_dto;
pub mod common_dto;
pub mod event_dto;
pub mod notification_dto;
pub mod participation_dto;
pub mod volunteer_dto;

pub use chat_dto::*;
pub use common_dto::*;
pub use event_dto::*;
pub use notification_dto::*;
pub use participation_dto::*;
pub use volunteer_dto::*;
