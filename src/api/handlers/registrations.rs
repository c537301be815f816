//! Registration handlers: take or give back a seat, and the organizer-side
//! participation transitions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Json, Router};

use crate::api::dto::{AttendanceRequest, ParticipationDto, RegisterRequest};
use crate::app_state::AppState;
use crate::domain::{EventId, ParticipationId, VolunteerId};
use crate::error::{ErrorResponse, HubError};

/// `POST /events/{id}/registrations` — Register a volunteer.
///
/// # Errors
///
/// Returns [`HubError::NotFound`], [`HubError::RegistrationClosed`],
/// [`HubError::AlreadyRegistered`], [`HubError::EventFull`] or
/// [`HubError::Conflict`].
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/registrations",
    tag = "Registrations",
    summary = "Register for an event",
    description = "Takes one seat for the volunteer. Fails if the event has started or closed, the volunteer already holds a non-cancelled participation, or no seat is left.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = ParticipationDto),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Already registered", body = ErrorResponse),
        (status = 422, description = "Event full or registration closed", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HubError> {
    let participation = state
        .registrations
        .register(
            EventId::from_uuid(id),
            VolunteerId::from_uuid(req.volunteer_id),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ParticipationDto::from(participation)),
    ))
}

/// `DELETE /events/{id}/registrations/{volunteer_id}` — Cancel a
/// registration.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] if the volunteer never registered and
/// [`HubError::InvalidState`] if nothing is left to cancel.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}/registrations/{volunteer_id}",
    tag = "Registrations",
    summary = "Cancel a registration",
    description = "Cancels the volunteer's active participation and frees its seat.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
        ("volunteer_id" = uuid::Uuid, Path, description = "Volunteer UUID"),
    ),
    responses(
        (status = 200, description = "Cancelled participation", body = ParticipationDto),
        (status = 404, description = "No registration", body = ErrorResponse),
        (status = 409, description = "Participation not active", body = ErrorResponse),
    )
)]
pub async fn cancel_registration(
    State(state): State<AppState>,
    Path((id, volunteer_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<impl IntoResponse, HubError> {
    let participation = state
        .registrations
        .cancel(EventId::from_uuid(id), VolunteerId::from_uuid(volunteer_id))
        .await?;
    Ok(Json(ParticipationDto::from(participation)))
}

/// `POST /participations/{id}/confirm` — Confirm a registration.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] or [`HubError::InvalidState`] unless the
/// participation is `registered`.
#[utoipa::path(
    post,
    path = "/api/v1/participations/{id}/confirm",
    tag = "Registrations",
    summary = "Confirm a participation",
    params(("id" = uuid::Uuid, Path, description = "Participation UUID")),
    responses(
        (status = 200, description = "Confirmed participation", body = ParticipationDto),
        (status = 404, description = "Participation not found", body = ErrorResponse),
        (status = 409, description = "Not in registered state", body = ErrorResponse),
    )
)]
pub async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let participation = state
        .registrations
        .confirm(ParticipationId::from_uuid(id))
        .await?;
    Ok(Json(ParticipationDto::from(participation)))
}

/// `POST /participations/{id}/attendance` — Record attendance and credit
/// hours.
///
/// # Errors
///
/// Returns [`HubError::InvalidRequest`] if `hours_logged` is out of range,
/// [`HubError::NotFound`] or [`HubError::InvalidState`] if the
/// participation is not active.
#[utoipa::path(
    post,
    path = "/api/v1/participations/{id}/attendance",
    tag = "Registrations",
    summary = "Record attendance",
    description = "Moves an active participation to `attended` and credits the hours to the volunteer exactly once.",
    params(("id" = uuid::Uuid, Path, description = "Participation UUID")),
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Attended participation", body = ParticipationDto),
        (status = 400, description = "hours_logged out of range", body = ErrorResponse),
        (status = 404, description = "Participation or volunteer not found", body = ErrorResponse),
        (status = 409, description = "Participation not active", body = ErrorResponse),
    )
)]
pub async fn record_attendance(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<AttendanceRequest>,
) -> Result<impl IntoResponse, HubError> {
    let participation = state
        .registrations
        .mark_attended(ParticipationId::from_uuid(id), req.validated_hours()?)
        .await?;
    Ok(Json(ParticipationDto::from(participation)))
}

/// `POST /participations/{id}/no-show` — Mark a no-show.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] or [`HubError::InvalidState`] if the
/// participation is not active.
#[utoipa::path(
    post,
    path = "/api/v1/participations/{id}/no-show",
    tag = "Registrations",
    summary = "Mark a no-show",
    params(("id" = uuid::Uuid, Path, description = "Participation UUID")),
    responses(
        (status = 200, description = "No-show participation", body = ParticipationDto),
        (status = 404, description = "Participation not found", body = ErrorResponse),
        (status = 409, description = "Participation not active", body = ErrorResponse),
    )
)]
pub async fn mark_no_show(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let participation = state
        .registrations
        .mark_no_show(ParticipationId::from_uuid(id))
        .await?;
    Ok(Json(ParticipationDto::from(participation)))
}

/// Registration and participation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/registrations", post(register))
        .route(
            "/events/{id}/registrations/{volunteer_id}",
            delete(cancel_registration),
        )
        .route("/participations/{id}/confirm", post(confirm))
        .route("/participations/{id}/attendance", post(record_attendance))
        .route("/participations/{id}/no-show", post(mark_no_show))
}
