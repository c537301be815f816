//! Volunteer handlers: profile, history and statistics.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateVolunteerRequest, ParticipationDto, VolunteerDto, VolunteerStatsDto, participation_dtos,
};
use crate::app_state::AppState;
use crate::domain::VolunteerId;
use crate::error::{ErrorResponse, HubError};

/// `POST /volunteers` — Create a volunteer profile.
///
/// # Errors
///
/// Returns [`HubError::InvalidRequest`] or [`HubError::Conflict`] if the id
/// already has a profile.
#[utoipa::path(
    post,
    path = "/api/v1/volunteers",
    tag = "Volunteers",
    summary = "Create a volunteer profile",
    request_body = CreateVolunteerRequest,
    responses(
        (status = 201, description = "Profile created", body = VolunteerDto),
        (status = 400, description = "Invalid profile", body = ErrorResponse),
        (status = 409, description = "Profile already exists", body = ErrorResponse),
    )
)]
pub async fn create_volunteer(
    State(state): State<AppState>,
    Json(req): Json<CreateVolunteerRequest>,
) -> Result<impl IntoResponse, HubError> {
    let volunteer = state
        .volunteers
        .create_volunteer(req.id.map(VolunteerId::from_uuid), &req.name, &req.email)
        .await?;
    Ok((StatusCode::CREATED, Json(VolunteerDto::from(volunteer))))
}

/// `GET /volunteers/{id}` — Volunteer profile.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] if no profile exists.
#[utoipa::path(
    get,
    path = "/api/v1/volunteers/{id}",
    tag = "Volunteers",
    summary = "Get a volunteer profile",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    responses(
        (status = 200, description = "Profile", body = VolunteerDto),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
    )
)]
pub async fn get_volunteer(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let volunteer = state
        .volunteers
        .get_volunteer(VolunteerId::from_uuid(id))
        .await?;
    Ok(Json(VolunteerDto::from(volunteer)))
}

/// `GET /volunteers/{id}/participations` — Participation history.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] if no profile exists.
#[utoipa::path(
    get,
    path = "/api/v1/volunteers/{id}/participations",
    tag = "Volunteers",
    summary = "List a volunteer's participations",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    responses(
        (status = 200, description = "Participation history", body = Vec<ParticipationDto>),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
    )
)]
pub async fn list_volunteer_participations(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let items = state
        .volunteers
        .list_volunteer_participations(VolunteerId::from_uuid(id))
        .await?;
    Ok(Json(participation_dtos(items)))
}

/// `GET /volunteers/{id}/stats` — Derived statistics.
///
/// Runs a completion sweep first so that ended events are credited.
///
/// # Errors
///
/// Returns [`HubError::NotFound`] if no profile exists.
#[utoipa::path(
    get,
    path = "/api/v1/volunteers/{id}/stats",
    tag = "Volunteers",
    summary = "Get volunteer statistics",
    description = "Totals, per-category attendance, upcoming registrations, rank by hours and level.",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    responses(
        (status = 200, description = "Statistics", body = VolunteerStatsDto),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, HubError> {
    let stats = state.stats.get_stats(VolunteerId::from_uuid(id)).await?;
    Ok(Json(VolunteerStatsDto::from(stats)))
}

/// Volunteer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/volunteers", post(create_volunteer))
        .route("/volunteers/{id}", get(get_volunteer))
        .route(
            "/volunteers/{id}/participations",
            get(list_volunteer_participations),
        )
        .route("/volunteers/{id}/stats", get(get_stats))
}
