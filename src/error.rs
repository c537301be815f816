//! Service error types with HTTP status code mapping.
//!
//! [`HubError`] is the central error type. Expected business outcomes (full
//! event, duplicate registration, wrong state) are distinct variants so that
//! callers can tell them apart. Each variant maps to a specific HTTP status
//! code and structured JSON error response.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::persistence::StoreError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2102,
///     "message": "event is full",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status                    |
/// |-----------|----------------------|--------------------------------|
/// | 1000–1999 | Validation / request | 400, 405, 415                  |
/// | 2000–2099 | Not found            | 404                            |
/// | 2100–2199 | Registration rules   | 409 Conflict / 422             |
/// | 3000–3999 | Server               | 500 Internal Server Error      |
/// | 4000–4999 | Chat relay upstream  | 429 / 500 / 502 / 504          |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (`"event"`, `"participation"`, ...).
        entity: &'static str,
        /// Identifier that was looked up.
        id: uuid::Uuid,
    },

    /// The volunteer already holds a participation for this event.
    #[error("volunteer is already registered for this event")]
    AlreadyRegistered,

    /// The event has no seat left.
    #[error("event is full")]
    EventFull,

    /// Registration is no longer possible (event started or closed).
    #[error("registration closed: {0}")]
    RegistrationClosed(String),

    /// A concurrent writer won the race for the same resource.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record is not in a state that permits the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP method not accepted by the endpoint.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Request body is not JSON.
    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,

    /// Client exceeded rate limit.
    #[error("rate limit exceeded; retry after {retry_after_secs} s")]
    RateLimited {
        /// Seconds until the client may retry.
        retry_after_secs: u64,
    },

    /// Upstream completion API did not answer in time.
    #[error("upstream request timed out")]
    UpstreamTimeout,

    /// Upstream completion API failed or returned an unusable payload.
    #[error("{message}")]
    UpstreamError {
        /// Upstream HTTP status, when the upstream answered with a non-2xx.
        status: Option<u16>,
        /// Summary message.
        message: String,
        /// Redacted upstream details for observability.
        details: Option<String>,
    },

    /// Required configuration is missing.
    #[error("server configuration error: {0}")]
    Configuration(String),

    /// Persistence layer failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Shorthand for [`HubError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<uuid::Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MethodNotAllowed(_) => 1002,
            Self::UnsupportedMediaType => 1003,
            Self::NotFound { .. } => 2001,
            Self::AlreadyRegistered => 2101,
            Self::EventFull => 2102,
            Self::RegistrationClosed(_) => 2103,
            Self::Conflict(_) => 2104,
            Self::InvalidState(_) => 2105,
            Self::Internal(_) => 3000,
            Self::Store(_) => 3001,
            Self::Configuration(_) => 3002,
            Self::RateLimited { .. } => 4001,
            Self::UpstreamTimeout => 4002,
            Self::UpstreamError { .. } => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadyRegistered | Self::Conflict(_) | Self::InvalidState(_) => {
                StatusCode::CONFLICT
            }
            Self::EventFull | Self::RegistrationClosed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamError {
                status: Some(_), ..
            } => StatusCode::BAD_GATEWAY,
            Self::UpstreamError { status: None, .. }
            | Self::Configuration(_)
            | Self::Store(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::UpstreamError { details, .. } => details.clone(),
            Self::UpstreamTimeout => Some("the request to the completion service timed out".into()),
            _ => None,
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if let Self::RateLimited { retry_after_secs } = self
            && let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_failures_stay_distinct() {
        let kinds = [
            HubError::AlreadyRegistered.error_code(),
            HubError::EventFull.error_code(),
            HubError::RegistrationClosed("started".into()).error_code(),
        ];
        assert_ne!(kinds[0], kinds[1]);
        assert_ne!(kinds[1], kinds[2]);
        assert_ne!(kinds[0], kinds[2]);
    }

    #[test]
    fn upstream_status_selects_gateway_code() {
        let with_status = HubError::UpstreamError {
            status: Some(503),
            message: "upstream error: 503".into(),
            details: None,
        };
        let without = HubError::UpstreamError {
            status: None,
            message: "no content".into(),
            details: None,
        };
        assert_eq!(with_status.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(without.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            HubError::UpstreamTimeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = HubError::RateLimited {
            retry_after_secs: 60,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER),
            Some(&HeaderValue::from_static("60"))
        );
    }
}
