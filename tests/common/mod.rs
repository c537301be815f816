//! Shared wiring for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, Response, StatusCode, header};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use volunteer_hub::app_state::AppState;
use volunteer_hub::chat::{
    ChatRelay, CompletionClient, GenerateRequest, GenerationConfig, SlidingWindowLimiter,
    UpstreamFailure,
};
use volunteer_hub::domain::{EventBus, ManualClock};
use volunteer_hub::persistence::MemoryStore;

/// Upstream stand-in answering every request with one Gemini candidate.
#[derive(Debug)]
pub struct CannedClient {
    pub configured: bool,
    pub text: String,
}

#[async_trait]
impl CompletionClient for CannedClient {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<Value, UpstreamFailure> {
        Ok(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": self.text}]}}]
        }))
    }
}

/// Instant the manual clock starts at.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// App state over a memory store, a manual clock and a canned upstream.
pub fn test_state(chat_configured: bool) -> (AppState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(epoch()));
    let store = Arc::new(MemoryStore::new());
    let client = Arc::new(CannedClient {
        configured: chat_configured,
        text: "Try the park clean-up on Saturday.".to_string(),
    });
    let limiter = Arc::new(SlidingWindowLimiter::new(
        30,
        Duration::from_secs(60),
        Arc::<ManualClock>::clone(&clock),
    ));
    let chat = ChatRelay::new(
        limiter,
        client,
        GenerationConfig::default(),
        Duration::from_secs(5),
    );
    let state = AppState::new(
        store,
        Arc::<ManualClock>::clone(&clock),
        EventBus::new(256),
        chat,
    );
    (state, clock)
}

/// Full router over [`test_state`].
pub fn build_test_app() -> (Router, Arc<ManualClock>) {
    let (state, clock) = test_state(true);
    (volunteer_hub::build_app(state), clock)
}

/// Sends one request through the router.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    let Ok(request) = request else {
        panic!("invalid request for {uri}");
    };
    let Ok(response) = app.clone().oneshot(request).await else {
        panic!("router failed on {uri}");
    };
    response
}

/// Posts a chat body as if it arrived from `peer`, optionally carrying an
/// `X-Forwarded-For` header.
pub async fn chat_from(
    app: &Router,
    peer: &str,
    forwarded_for: Option<&str>,
    body: &Value,
) -> Response<Body> {
    let Ok(addr) = peer.parse::<SocketAddr>() else {
        panic!("invalid peer address {peer}");
    };
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(forwarded_for) = forwarded_for {
        builder = builder.header("x-forwarded-for", forwarded_for);
    }
    let Ok(mut request) = builder.body(Body::from(body.to_string())) else {
        panic!("invalid chat request");
    };
    request.extensions_mut().insert(ConnectInfo(addr));
    let Ok(response) = app.clone().oneshot(request).await else {
        panic!("router failed on chat");
    };
    response
}

/// Reads a response body as JSON (`Value::Null` when empty).
pub async fn body_json(response: Response<Body>) -> Value {
    let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body read failed");
    };
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Sends a request and returns status plus JSON body.
pub async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = send(app, method, uri, body).await;
    let status = response.status();
    (status, body_json(response).await)
}

/// Creates a volunteer and returns its id.
pub async fn create_volunteer(app: &Router, name: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/volunteers",
        Some(json!({"name": name, "email": format!("{name}@example.org")})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let Some(id) = body["id"].as_str() else {
        panic!("volunteer without id: {body}");
    };
    id.to_string()
}

/// Creates an event one day after [`epoch`], lasting three hours.
pub async fn create_event(app: &Router, max_participants: u32, category: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/events",
        Some(json!({
            "title": "Riverbank clean-up",
            "description": "Bring gloves",
            "location": "North pier",
            "start_time": "2025-06-02T09:00:00Z",
            "end_time": "2025-06-02T12:00:00Z",
            "max_participants": max_participants,
            "category": category,
            "hours": 3,
            "organizer_id": "6f1c2a3e-0000-4000-8000-000000000001",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let Some(id) = body["id"].as_str() else {
        panic!("event without id: {body}");
    };
    id.to_string()
}

/// Registers a volunteer and returns the participation body.
pub async fn register(app: &Router, event_id: &str, volunteer_id: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        &format!("/api/v1/events/{event_id}/registrations"),
        Some(json!({"volunteer_id": volunteer_id})),
    )
    .await
}
