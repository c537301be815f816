//! WebSocket layer: live activity feed.
//!
//! Clients connected to `/ws` follow event ids (or `"*"`) and receive the
//! matching [`crate::domain::ActivityEvent`]s, which carry live seat counts.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
