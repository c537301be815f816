//! REST endpoint handlers organized by resource.

pub mod chat;
pub mod events;
pub mod notifications;
pub mod registrations;
pub mod system;
pub mod volunteers;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(events::routes())
        .merge(registrations::routes())
        .merge(volunteers::routes())
        .merge(notifications::routes())
        .merge(system::admin_routes())
}
