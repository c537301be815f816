//! Upstream completion API client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::messages::GenerateRequest;
use crate::config::ChatConfig;
use crate::error::HubError;

/// Longest upstream error body passed on to callers.
const MAX_DETAILS_LEN: usize = 512;

/// Failure talking to the upstream API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamFailure {
    /// No answer within the timeout.
    #[error("upstream request timed out")]
    Timeout,

    /// Answered with a non-2xx status.
    #[error("upstream returned HTTP {status}")]
    Status {
        /// HTTP status.
        status: u16,
        /// Response body, redacted and truncated.
        body: String,
    },

    /// Connection or protocol failure.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// 2xx answer whose body is not JSON.
    #[error("upstream returned an unreadable body: {0}")]
    Decode(String),
}

/// A completion endpoint the relay forwards to.
#[async_trait]
pub trait CompletionClient: Send + Sync + fmt::Debug {
    /// `false` when the client lacks credentials.
    fn is_configured(&self) -> bool;

    /// Sends one `generateContent` request and returns the raw JSON answer.
    async fn generate(&self, request: &GenerateRequest) -> Result<Value, UpstreamFailure>;
}

/// Client for the Gemini `generateContent` endpoint.
///
/// The key travels in the `x-goog-api-key` header, never in the URL, so it
/// cannot end up in request logs.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Builds a client from the chat configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &ChatConfig) -> Result<Self, HubError> {
        Self::with_endpoint(
            format!("{}/models/{}:generateContent", config.base_url, config.model),
            config.api_key.clone(),
            config.timeout,
        )
    }

    /// Builds a client for an explicit endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Configuration`] if the HTTP client cannot be built.
    pub fn with_endpoint(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, HubError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HubError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    fn redact(&self, body: &str) -> String {
        let redacted = match &self.api_key {
            Some(key) if !key.is_empty() => body.replace(key.as_str(), "[REDACTED]"),
            _ => body.to_string(),
        };
        truncate(redacted, MAX_DETAILS_LEN)
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Value, UpstreamFailure> {
        let key = self.api_key.as_deref().unwrap_or_default();
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", key)
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamFailure::Status {
                status: status.as_u16(),
                body: self.redact(&body),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamFailure::Timeout
            } else {
                UpstreamFailure::Decode(e.to_string())
            }
        })
    }
}

fn classify(err: reqwest::Error) -> UpstreamFailure {
    if err.is_timeout() {
        UpstreamFailure::Timeout
    } else {
        UpstreamFailure::Transport(err.without_url().to_string())
    }
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn redact_hides_key_and_truncates() {
        let Ok(client) = GeminiClient::with_endpoint(
            "http://localhost/x".into(),
            Some("k3y".into()),
            Duration::from_secs(1),
        ) else {
            panic!("client build failed");
        };
        assert_eq!(client.redact("bad key k3y"), "bad key [REDACTED]");
        let long = "é".repeat(600);
        assert!(client.redact(&long).len() <= MAX_DETAILS_LEN + '…'.len_utf8());
    }

    #[test]
    fn unconfigured_without_key() {
        let Ok(client) =
            GeminiClient::with_endpoint("http://localhost/x".into(), None, Duration::from_secs(1))
        else {
            panic!("client build failed");
        };
        assert!(!client.is_configured());
        assert!(!format!("{client:?}").contains("k3y"));
    }
}
