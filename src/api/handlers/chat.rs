//! Chat relay endpoint.
//!
//! Mounted outside the global CORS layer: it carries its own fixed CORS
//! headers on every response, including errors and the preflight.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{Extensions, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};

use crate::api::dto::ChatRequestBody;
use crate::app_state::AppState;
use crate::chat::{ChatCompletion, ChatRequest};
use crate::error::ErrorResponse;

fn cors_headers() -> [(HeaderName, HeaderValue); 4] {
    [
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ),
        (
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("86400"),
        ),
    ]
}

fn no_store_headers() -> [(HeaderName, HeaderValue); 4] {
    [
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
        ),
        (header::PRAGMA, HeaderValue::from_static("no-cache")),
        (header::EXPIRES, HeaderValue::from_static("0")),
        (
            HeaderName::from_static("surrogate-control"),
            HeaderValue::from_static("no-store"),
        ),
    ]
}

/// `POST /chat` — Relay a conversation to the completion API.
///
/// Every method reaches this handler: `OPTIONS` is the CORS preflight
/// (204), anything else but `POST` is rejected by the relay with 405.
/// Callers are rate-limited by peer address, taken from the connection
/// info the server attaches to each request.
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "Chat",
    summary = "Relay a chat conversation",
    description = "Validates and sanitizes the messages, forwards them to the upstream completion API and returns the answer as `{choices:[{message:{role,content}}]}`. Limited to 30 requests per minute per caller address.",
    request_body = ChatRequestBody,
    responses(
        (status = 200, description = "Assistant answer", body = ChatCompletion),
        (status = 400, description = "Invalid messages", body = ErrorResponse),
        (status = 405, description = "Method not allowed", body = ErrorResponse),
        (status = 415, description = "Body is not JSON", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Missing configuration or unusable upstream payload", body = ErrorResponse),
        (status = 502, description = "Upstream returned an error status", body = ErrorResponse),
        (status = 504, description = "Upstream timed out", body = ErrorResponse),
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return with_cors(StatusCode::NO_CONTENT.into_response());
    }

    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_key = state.chat.client_key(&headers, peer);
    let request = ChatRequest::from_parts(method, &headers, client_key, body);
    let response = match state.chat.handle(request).await {
        Ok(completion) => (no_store_headers(), Json(completion)).into_response(),
        Err(e) => e.into_response(),
    };
    with_cors(response)
}

fn with_cors(mut response: Response) -> Response {
    response.headers_mut().extend(cors_headers());
    response
}

/// Chat routes, already nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/chat", any(chat))
}
