//! Notification handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{MarkAllReadResponse, NotificationDto, UnreadCountResponse};
use crate::app_state::AppState;
use crate::domain::NotificationId;
use crate::error::{ErrorResponse, HubError};

/// `GET /users/{id}/notifications` — A user's notifications, newest first.
///
/// # Errors
///
/// Returns [`HubError::Store`] on persistence failures.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/notifications",
    tag = "Notifications",
    summary = "List notifications",
    params(("id" = uuid::Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Notifications, newest first", body = Vec<NotificationDto>),
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let items = state.notifications.list(user_id).await?;
    let data: Vec<NotificationDto> = items.into_iter().map(NotificationDto::from).collect();
    Ok(Json(data))
}

/// `GET /users/{id}/notifications/unread-count`
///
/// # Errors
///
/// Returns [`HubError::Store`] on persistence failures.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/notifications/unread-count",
    tag = "Notifications",
    summary = "Count unread notifications",
    params(("id" = uuid::Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
    )
)]
pub async fn unread_count(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let unread = state.notifications.unread_count(user_id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// `POST /users/{id}/notifications/read-all`
///
/// # Errors
///
/// Returns [`HubError::Store`] on persistence failures.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/notifications/read-all",
    tag = "Notifications",
    summary = "Mark all notifications read",
    params(("id" = uuid::Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Number of notifications changed", body = MarkAllReadResponse),
    )
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let updated = state.notifications.mark_all_read(user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// `POST /notifications/{id}/read`
///
/// # Errors
///
/// Returns [`HubError::NotFound`] if the notification does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    tag = "Notifications",
    summary = "Mark a notification read",
    params(("id" = uuid::Uuid, Path, description = "Notification UUID")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    state
        .notifications
        .mark_read(NotificationId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{id}/notifications", get(list_notifications))
        .route("/users/{id}/notifications/unread-count", get(unread_count))
        .route("/users/{id}/notifications/read-all", post(mark_all_read))
        .route("/notifications/{id}/read", post(mark_read))
}
