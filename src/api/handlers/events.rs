//! Event handlers: create, list, get, update, cancel, delete, roster.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    DeleteEventResponse, EventDto, EventListResponse, EventQuery, PaginationParams,
    ParticipationDto, participation_dtos,
};
use crate::app_state::AppState;
use crate::domain::{EventFilter, EventId, EventPatch, NewEvent};
use crate::error::{ErrorResponse, HubError};

/// `POST /events` — Publish a new event.
///
/// # Errors
///
/// Returns [`HubError::InvalidRequest`] if the draft fails validation.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create an event",
    description = "Publishes an `upcoming` event with no participants.",
    request_body = NewEvent,
    responses(
        (status = 201, description = "Event created", body = EventDto),
        (status = 400, description = "Invalid event", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(draft): Json<NewEvent>,
) -> Result<impl IntoResponse, HubError> {
    let event = state.events.create_event(draft).await?;
    Ok((StatusCode::CREATED, Json(EventDto::from(event))))
}

/// `GET /events` — List events, optionally filtered by status and category.
///
/// # Errors
///
/// Returns [`HubError::Store`] on persistence failures.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    description = "Returns a paginated list of events ordered by start time.",
    params(EventQuery, PaginationParams),
    responses(
        (status = 200, description = "Paginated event list", body = EventListResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, HubError> {
    let events = state.events.list_events(&EventFilter::from(query)).await?;
    let (data, pagination) = page.paginate(events);
    Ok(Json(EventListResponse {
        data: data.into_iter().map(EventDto::from).collect(),
        pagination,
    }))
}

/// `GET /events/{id}` — Event details.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get an event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event details", body = EventDto),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let event = state.events.get_event(EventId::from_uuid(id)).await?;
    Ok(Json(EventDto::from(event)))
}

/// `PATCH /events/{id}` — Edit an event.
///
/// # Errors
///
/// Returns [`HubError::NotFound`], [`HubError::InvalidRequest`] for an
/// invalid patch, or [`HubError::InvalidState`] for a closed event.
#[utoipa::path(
    patch,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Update an event",
    description = "Partially updates descriptive fields, times, capacity, category and hours. Capacity may not drop below the seats already taken.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = EventPatch,
    responses(
        (status = 200, description = "Updated event", body = EventDto),
        (status = 400, description = "Invalid patch", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event is closed or changed concurrently", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(patch): Json<EventPatch>,
) -> Result<impl IntoResponse, HubError> {
    let event = state
        .events
        .update_event(EventId::from_uuid(id), &patch)
        .await?;
    Ok(Json(EventDto::from(event)))
}

/// `POST /events/{id}/cancel` — Cancel an open event.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] or [`HubError::InvalidState`] if the
/// event is already closed.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/cancel",
    tag = "Events",
    summary = "Cancel an event",
    description = "Moves an `upcoming` or `ongoing` event to `cancelled` and notifies active registrants.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Cancelled event", body = EventDto),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event already closed", body = ErrorResponse),
    )
)]
pub async fn cancel_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let event = state.events.cancel_event(EventId::from_uuid(id)).await?;
    Ok(Json(EventDto::from(event)))
}

/// `DELETE /events/{id}` — Delete an event and its participations.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] if the event does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Delete an event",
    description = "Removes the event together with its participations.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event deleted", body = DeleteEventResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let participations_removed = state.events.delete_event(EventId::from_uuid(id)).await?;
    Ok(Json(DeleteEventResponse {
        event_id: id,
        participations_removed,
    }))
}

/// `GET /events/{id}/participations` — Event roster.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/participations",
    tag = "Events",
    summary = "List an event's participations",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Participations by registration time", body = Vec<ParticipationDto>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_event_participations(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let items = state
        .events
        .list_event_participations(EventId::from_uuid(id))
        .await?;
    Ok(Json(participation_dtos(items)))
}

/// Event management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route(
            "/events/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/events/{id}/cancel", post(cancel_event))
        .route(
            "/events/{id}/participations",
            get(list_event_participations),
        )
}
