//! OpenAPI document assembled from the handler annotations.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use super::dto;
use super::handlers::{chat, events, notifications, registrations, system, volunteers};
use crate::app_state::AppState;
use crate::chat::{ChatMessage, Role, normalize};
use crate::domain::{
    EventCategory, EventPatch, EventStatus, NewEvent, NotificationKind, ParticipationStatus,
    VolunteerLevel,
};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::SweepReport;

/// Path of the served OpenAPI JSON document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// The service's OpenAPI document.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "volunteer-hub",
        description = "Volunteer event registration, completion crediting, statistics and chat relay."
    ),
    paths(
        system::health_handler,
        system::sweep_handler,
        events::create_event,
        events::list_events,
        events::get_event,
        events::update_event,
        events::cancel_event,
        events::delete_event,
        events::list_event_participations,
        registrations::register,
        registrations::cancel_registration,
        registrations::confirm,
        registrations::record_attendance,
        registrations::mark_no_show,
        volunteers::create_volunteer,
        volunteers::get_volunteer,
        volunteers::list_volunteer_participations,
        volunteers::get_stats,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_all_read,
        notifications::mark_read,
        chat::chat,
    ),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        NewEvent,
        EventPatch,
        EventCategory,
        EventStatus,
        ParticipationStatus,
        NotificationKind,
        VolunteerLevel,
        SweepReport,
        ChatMessage,
        Role,
        normalize::ChatCompletion,
        normalize::ChatChoice,
        normalize::AssistantMessage,
        system::HealthResponse,
        dto::EventDto,
        dto::EventListResponse,
        dto::DeleteEventResponse,
        dto::PaginationMeta,
        dto::ParticipationDto,
        dto::RegisterRequest,
        dto::AttendanceRequest,
        dto::CreateVolunteerRequest,
        dto::VolunteerDto,
        dto::VolunteerStatsDto,
        dto::NotificationDto,
        dto::UnreadCountResponse,
        dto::MarkAllReadResponse,
        dto::ChatRequestBody,
    )),
    tags(
        (name = "Events", description = "Organizer-side event management"),
        (name = "Registrations", description = "Seats and participation lifecycle"),
        (name = "Volunteers", description = "Profiles, history and statistics"),
        (name = "Notifications", description = "Per-user notifications"),
        (name = "Chat", description = "Assistant relay"),
        (name = "System", description = "Health and maintenance"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON, plus Swagger UI when the `swagger-ui` feature
/// is on.
pub fn routes() -> Router<AppState> {
    let router = Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()),
    );

    router
}
