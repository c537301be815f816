//! # volunteer-hub
//!
//! Volunteer event coordination service: organizers publish capacity-bound
//! events, volunteers register and cancel, ended events are reconciled and
//! credited, per-volunteer statistics are derived, and a chat relay fronts
//! an upstream completion API.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)          ├── Chat endpoint (api/handlers/chat)
//!     ├── WS activity feed (ws/)        │
//!     │                                 └── ChatRelay (chat/)
//!     ├── Services (service/)                 ├── SlidingWindowLimiter
//!     │     RegistrationService               ├── sanitize / reshape / normalize
//!     │     CompletionSweeper                 └── GeminiClient (reqwest)
//!     │     StatsService, EventService,
//!     │     VolunteerService, NotificationService
//!     ├── EventBus + Clock (domain/)
//!     │
//!     └── Store (persistence/): MemoryStore | PostgresStore (sqlx)
//! ```

pub mod api;
pub mod app_state;
pub mod chat;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the complete HTTP application: REST API, chat relay, WebSocket
/// feed and OpenAPI document.
///
/// The chat route is merged after the global CORS layer so that it keeps
/// its own fixed CORS headers.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .merge(api::openapi::routes())
        .route("/ws", get(ws::handler::ws_handler))
        .layer(CorsLayer::permissive())
        .merge(api::handlers::chat::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
