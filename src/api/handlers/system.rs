//! System endpoints: health check and maintenance.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::{ErrorResponse, HubError};
use crate::service::SweepReport;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    ws_subscribers: usize,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, current timestamp and the number of live activity subscribers.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ws_subscribers: state.event_bus.receiver_count(),
        }),
    )
}

/// `POST /admin/sweep` — Run one completion sweep now.
///
/// # Errors
///
/// Returns [`HubError::Store`] if ended events cannot be listed.
#[utoipa::path(
    post,
    path = "/api/v1/admin/sweep",
    tag = "System",
    summary = "Run a completion sweep",
    description = "Completes every open event whose end time has passed and credits its confirmed participants. Per-event failures are listed in `failed` and retried on the next sweep.",
    responses(
        (status = 200, description = "Sweep report", body = SweepReport),
        (status = 500, description = "Sweep could not start", body = ErrorResponse),
    )
)]
pub async fn sweep_handler(State(state): State<AppState>) -> Result<impl IntoResponse, HubError> {
    let report = state.sweeper.sweep().await?;
    Ok(Json(report))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

/// Maintenance routes, nested under `/api/v1`.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/sweep", post(sweep_handler))
}
