//! Chat relay: guards, reshapes and forwards chat requests upstream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, header};
use serde_json::Value;

use super::messages::{GenerationConfig, parse_messages, reshape};
use super::normalize::{ChatCompletion, normalize};
use super::rate_limiter::SlidingWindowLimiter;
use super::upstream::{CompletionClient, UpstreamFailure};
use crate::config::ChatConfig;
use crate::domain::Clock;
use crate::error::HubError;

/// Bucket used when the caller address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// One inbound chat request, detached from the HTTP framework.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// HTTP method.
    pub method: Method,
    /// `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Rate-limit bucket key (caller address).
    pub client_key: String,
    /// Raw body.
    pub body: Bytes,
}

impl ChatRequest {
    /// Builds a request from HTTP parts and an already resolved caller key.
    #[must_use]
    pub fn from_parts(
        method: Method,
        headers: &HeaderMap,
        client_key: String,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            content_type: headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            client_key,
            body,
        }
    }
}

/// Rate-limit key for a caller.
///
/// The peer IP is used unless `trust_forwarded` is set, in which case the
/// first `X-Forwarded-For` hop, then `X-Real-IP`, take precedence.
/// [`UNKNOWN_CLIENT`] only when no address is available at all.
#[must_use]
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> String {
    if trust_forwarded && let Some(forwarded) = forwarded_client(headers) {
        return forwarded.to_string();
    }
    peer.map_or_else(|| UNKNOWN_CLIENT.to_string(), |addr| addr.ip().to_string())
}

fn forwarded_client(headers: &HeaderMap) -> Option<&str> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    forwarded.or_else(real_ip)
}

/// Forwards chat conversations to the upstream completion API.
///
/// Order of checks: method, content type, rate limit, upstream
/// credentials, message validation. Nothing is sent upstream unless every
/// check passes.
#[derive(Debug)]
pub struct ChatRelay {
    limiter: Arc<SlidingWindowLimiter>,
    client: Arc<dyn CompletionClient>,
    generation: GenerationConfig,
    timeout: Duration,
    trust_forwarded: bool,
}

impl ChatRelay {
    /// Creates a new `ChatRelay`.
    #[must_use]
    pub fn new(
        limiter: Arc<SlidingWindowLimiter>,
        client: Arc<dyn CompletionClient>,
        generation: GenerationConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            limiter,
            client,
            generation,
            timeout,
            trust_forwarded: false,
        }
    }

    /// Keys callers by forwarding headers instead of the peer address.
    #[must_use]
    pub const fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }

    /// Rate-limit key for a caller, per this relay's proxy setting.
    #[must_use]
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        client_key(headers, peer, self.trust_forwarded)
    }

    /// Builds a relay from the chat configuration around `client`.
    #[must_use]
    pub fn from_config(
        config: &ChatConfig,
        client: Arc<dyn CompletionClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = SlidingWindowLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window,
            clock,
        );
        Self::new(
            Arc::new(limiter),
            client,
            GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
            config.timeout,
        )
        .trust_forwarded_headers(config.trust_forwarded_headers)
    }

    /// Handles one chat request.
    ///
    /// # Errors
    ///
    /// - [`HubError::MethodNotAllowed`] for anything but POST
    /// - [`HubError::UnsupportedMediaType`] without a JSON content type
    /// - [`HubError::RateLimited`] when the caller is over budget
    /// - [`HubError::Configuration`] without upstream credentials
    /// - [`HubError::InvalidRequest`] for a malformed message list
    /// - [`HubError::UpstreamTimeout`] / [`HubError::UpstreamError`] when
    ///   the upstream call fails or returns no content
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatCompletion, HubError> {
        if request.method != Method::POST {
            return Err(HubError::MethodNotAllowed(request.method.to_string()));
        }
        let is_json = request
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
        if !is_json {
            return Err(HubError::UnsupportedMediaType);
        }

        if !self.limiter.check(&request.client_key) {
            tracing::warn!(client = %request.client_key, "chat rate limit exceeded");
            return Err(HubError::RateLimited {
                retry_after_secs: self.limiter.retry_after_secs(),
            });
        }

        if !self.client.is_configured() {
            tracing::error!("chat upstream API key not configured");
            return Err(HubError::Configuration(
                "API key not configured".to_string(),
            ));
        }

        let messages = parse_messages(&request.body)?;
        let upstream_request = reshape(&messages, self.generation);
        tracing::debug!(turns = upstream_request.contents.len(), "forwarding chat request");

        let payload = match tokio::time::timeout(
            self.timeout,
            self.client.generate(&upstream_request),
        )
        .await
        {
            Err(_) | Ok(Err(UpstreamFailure::Timeout)) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "chat upstream timed out");
                return Err(HubError::UpstreamTimeout);
            }
            Ok(Err(UpstreamFailure::Status { status, body })) => {
                tracing::error!(status, "chat upstream returned an error status");
                return Err(HubError::UpstreamError {
                    status: Some(status),
                    message: format!("upstream API error: {status}"),
                    details: Some(body),
                });
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "chat upstream request failed");
                return Err(HubError::UpstreamError {
                    status: None,
                    message: "error communicating with the completion service".to_string(),
                    details: Some(e.to_string()),
                });
            }
            Ok(Ok(payload)) => payload,
        };

        check_payload(&payload)?;
        Ok(normalize(&payload))
    }
}

/// Rejects payloads that carry an error or no content at all.
fn check_payload(payload: &Value) -> Result<(), HubError> {
    if let Some(error) = payload.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("error in upstream API response")
            .to_string();
        tracing::error!(%message, "chat upstream payload contains an error");
        return Err(HubError::UpstreamError {
            status: None,
            message,
            details: None,
        });
    }

    let empty = match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    let candidate_without_content = payload.get("candidates").is_some_and(|candidates| {
        candidates
            .get(0)
            .and_then(|c| c.get("content"))
            .is_none_or(Value::is_null)
    });
    if empty || candidate_without_content {
        tracing::error!("no content in chat upstream payload");
        return Err(HubError::UpstreamError {
            status: None,
            message: "no content in upstream API response".to_string(),
            details: None,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::http::{HeaderValue, StatusCode};
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::chat::messages::GenerateRequest;
    use crate::domain::ManualClock;

    #[derive(Debug)]
    struct SpyClient {
        calls: AtomicUsize,
        configured: bool,
        answer: Mutex<Option<Result<Value, UpstreamFailure>>>,
        last_request: Mutex<Option<GenerateRequest>>,
    }

    impl SpyClient {
        fn answering(answer: Result<Value, UpstreamFailure>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                configured: true,
                answer: Mutex::new(Some(answer)),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for SpyClient {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<Value, UpstreamFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = self.last_request.lock() {
                *last = Some(request.clone());
            }
            let answer = self.answer.lock().ok().and_then(|a| a.clone());
            answer.unwrap_or(Ok(Value::Null))
        }
    }

    #[derive(Debug)]
    struct SlowClient;

    #[async_trait]
    impl CompletionClient for SlowClient {
        fn is_configured(&self) -> bool {
            true
        }

        async fn generate(&self, _request: &GenerateRequest) -> Result<Value, UpstreamFailure> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!({"text": "late"}))
        }
    }

    fn relay_with(client: Arc<dyn CompletionClient>) -> (ChatRelay, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = Arc::new(SlidingWindowLimiter::new(
            30,
            Duration::from_secs(60),
            Arc::<ManualClock>::clone(&clock),
        ));
        let relay = ChatRelay::new(
            limiter,
            client,
            GenerationConfig::default(),
            Duration::from_secs(10),
        );
        (relay, clock)
    }

    fn post(body: Value) -> ChatRequest {
        ChatRequest {
            method: Method::POST,
            content_type: Some("application/json; charset=utf-8".to_string()),
            client_key: "203.0.113.7".to_string(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn hello() -> Value {
        json!({"messages": [{"role": "user", "content": "hello"}]})
    }

    fn candidate(text: &str) -> Value {
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
    }

    #[tokio::test]
    async fn bogus_role_never_reaches_upstream() {
        let spy = SpyClient::answering(Ok(candidate("hi")));
        let (relay, _) = relay_with(Arc::<SpyClient>::clone(&spy));
        let body = json!({"messages": [{"role": "bogus", "content": "hello"}]});

        let result = relay.handle(post(body)).await;
        let Err(err) = result else {
            panic!("bogus role accepted");
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn candidate_text_becomes_choice_content() {
        let spy = SpyClient::answering(Ok(candidate("Join the beach clean-up!")));
        let (relay, _) = relay_with(Arc::<SpyClient>::clone(&spy));

        let Ok(completion) = relay.handle(post(hello())).await else {
            panic!("relay failed");
        };
        assert_eq!(completion.choices[0].message.role, "assistant");
        assert_eq!(
            completion.choices[0].message.content,
            "Join the beach clean-up!"
        );
        assert_eq!(spy.calls(), 1);
    }

    #[tokio::test]
    async fn input_is_sanitized_and_reshaped_before_forwarding() {
        let spy = SpyClient::answering(Ok(candidate("ok")));
        let (relay, _) = relay_with(Arc::<SpyClient>::clone(&spy));
        let body = json!({"messages": [
            {"role": "system", "content": "Be kind"},
            {"role": "user", "content": "<b>hi</b>"}
        ]});

        assert!(relay.handle(post(body)).await.is_ok());
        let Ok(last) = spy.last_request.lock() else {
            panic!("poisoned");
        };
        let Some(sent) = last.as_ref() else {
            panic!("nothing forwarded");
        };
        assert_eq!(sent.contents.len(), 1);
        assert_eq!(
            sent.contents[0].parts[0].text,
            "Be kind\n\n&lt;b&gt;hi&lt;&#x2F;b&gt;"
        );
    }

    #[tokio::test]
    async fn thirty_first_request_is_rate_limited_then_recovers() {
        let spy = SpyClient::answering(Ok(candidate("ok")));
        let (relay, clock) = relay_with(Arc::<SpyClient>::clone(&spy));

        for _ in 0..30 {
            assert!(relay.handle(post(hello())).await.is_ok());
        }
        let Err(HubError::RateLimited { retry_after_secs }) = relay.handle(post(hello())).await
        else {
            panic!("31st request allowed");
        };
        assert_eq!(retry_after_secs, 60);
        assert_eq!(spy.calls(), 30);

        clock.advance(chrono::Duration::seconds(60));
        assert!(relay.handle(post(hello())).await.is_ok());
    }

    #[tokio::test]
    async fn method_and_content_type_are_checked_first() {
        let spy = SpyClient::answering(Ok(candidate("ok")));
        let (relay, _) = relay_with(Arc::<SpyClient>::clone(&spy));

        let mut get = post(hello());
        get.method = Method::GET;
        assert!(matches!(
            relay.handle(get).await,
            Err(HubError::MethodNotAllowed(_))
        ));

        let mut text = post(hello());
        text.content_type = Some("text/plain".to_string());
        assert!(matches!(
            relay.handle(text).await,
            Err(HubError::UnsupportedMediaType)
        ));
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn missing_key_is_a_configuration_error() {
        let spy = Arc::new(SpyClient {
            calls: AtomicUsize::new(0),
            configured: false,
            answer: Mutex::new(None),
            last_request: Mutex::new(None),
        });
        let (relay, _) = relay_with(Arc::<SpyClient>::clone(&spy));
        let Err(err) = relay.handle(post(hello())).await else {
            panic!("unconfigured relay answered");
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, HubError::Configuration(_)));
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn upstream_status_maps_to_bad_gateway() {
        let spy = SpyClient::answering(Err(UpstreamFailure::Status {
            status: 503,
            body: "overloaded".to_string(),
        }));
        let (relay, _) = relay_with(spy);
        let Err(err) = relay.handle(post(hello())).await else {
            panic!("upstream failure hidden");
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn empty_or_erroring_payloads_are_server_errors() {
        for payload in [
            json!({}),
            json!({"error": {"message": "quota"}}),
            json!({"candidates": []}),
        ] {
            let spy = SpyClient::answering(Ok(payload));
            let (relay, _) = relay_with(spy);
            let Err(err) = relay.handle(post(hello())).await else {
                panic!("bad payload accepted");
            };
            assert!(matches!(err, HubError::UpstreamError { status: None, .. }));
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_times_out() {
        let (relay, _) = relay_with(Arc::new(SlowClient));
        assert!(matches!(
            relay.handle(post(hello())).await,
            Err(HubError::UpstreamTimeout)
        ));
    }

    fn peer(addr: &str) -> Option<SocketAddr> {
        addr.parse().ok()
    }

    #[test]
    fn client_key_uses_peer_address_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.5"));

        assert_eq!(
            client_key(&headers, peer("192.0.2.10:51000"), false),
            "192.0.2.10"
        );
        assert_eq!(client_key(&headers, None, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn trusted_proxy_headers_take_precedence() {
        let mut headers = HeaderMap::new();
        let proxy = peer("10.0.0.1:443");
        assert_eq!(client_key(&headers, proxy, true), "10.0.0.1");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_key(&headers, proxy, true), "198.51.100.2");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_key(&headers, proxy, true), "203.0.113.7");
    }

    #[tokio::test]
    async fn rotating_forwarded_header_does_not_escape_the_limit() {
        let spy = SpyClient::answering(Ok(candidate("ok")));
        let (relay, _) = relay_with(Arc::<SpyClient>::clone(&spy));
        let addr = peer("192.0.2.10:51000");

        let mut allowed = 0;
        for i in 0..40 {
            let mut headers = HeaderMap::new();
            let Ok(value) = HeaderValue::from_str(&format!("1.2.3.{i}")) else {
                panic!("invalid header value");
            };
            headers.insert("x-forwarded-for", value);
            let mut request = post(hello());
            request.client_key = relay.client_key(&headers, addr);
            if relay.handle(request).await.is_ok() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 30);
    }
}
