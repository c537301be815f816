//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Missing or unparsable numeric values
//! fall back to their defaults.

use std::net::SocketAddr;
use std::time::Duration;

/// Default upstream completion API base URL.
pub const DEFAULT_CHAT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default upstream model.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";

/// Top-level service configuration.
///
/// Loaded once at startup via [`HubConfig::from_env`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// PostgreSQL settings; `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,

    /// Seconds between completion sweeps (0 = timer disabled).
    pub sweep_interval_secs: u64,

    /// Capacity of the activity broadcast channel.
    pub event_bus_capacity: usize,

    /// Chat relay settings.
    pub chat: ChatConfig,

    /// Emit JSON log lines instead of human-readable text.
    pub log_json: bool,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub url: String,

    /// Maximum number of database connections in the pool.
    pub max_connections: u32,

    /// Minimum idle connections in the pool.
    pub min_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub connect_timeout_secs: u64,

    /// Apply embedded migrations at startup.
    pub run_migrations: bool,
}

/// Chat relay and upstream settings.
#[derive(Clone)]
pub struct ChatConfig {
    /// Upstream API key. Requests fail with a configuration error when unset.
    pub api_key: Option<String>,

    /// Upstream base URL, without trailing slash.
    pub base_url: String,

    /// Upstream model name.
    pub model: String,

    /// Hard bound on one upstream call.
    pub timeout: Duration,

    /// Requests allowed per caller per window.
    pub rate_limit_max_requests: u32,

    /// Rate-limit window length.
    pub rate_limit_window: Duration,

    /// Sampling temperature sent upstream.
    pub temperature: f32,

    /// Output token cap sent upstream.
    pub max_output_tokens: u32,

    /// Key callers by `X-Forwarded-For` / `X-Real-IP` instead of the peer
    /// address. Only enable behind a proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .finish()
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            timeout: Duration::from_secs(10),
            rate_limit_max_requests: 30,
            rate_limit_window: Duration::from_secs(60),
            temperature: 0.7,
            max_output_tokens: 2048,
            trust_forwarded_headers: false,
        }
    }
}

impl ChatConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("CHAT_UPSTREAM_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            model: std::env::var("CHAT_MODEL").unwrap_or(defaults.model),
            timeout: Duration::from_secs(parse_env("CHAT_TIMEOUT_SECS", 10)),
            rate_limit_max_requests: parse_env(
                "CHAT_RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            ),
            rate_limit_window: Duration::from_secs(parse_env("CHAT_RATE_LIMIT_WINDOW_SECS", 60)),
            temperature: parse_env("CHAT_TEMPERATURE", defaults.temperature),
            max_output_tokens: parse_env("CHAT_MAX_OUTPUT_TOKENS", defaults.max_output_tokens),
            trust_forwarded_headers: parse_env_bool("CHAT_TRUST_FORWARDED_HEADERS", false),
        }
    }
}

impl HubConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let database = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 2),
                connect_timeout_secs: parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5),
                run_migrations: parse_env_bool("DATABASE_RUN_MIGRATIONS", true),
            });

        let log_json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

        Ok(Self {
            listen_addr,
            database,
            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS", 300),
            event_bus_capacity: parse_env("EVENT_BUS_CAPACITY", 10_000),
            chat: ChatConfig::from_env(),
            log_json,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_defaults_match_relay_policy() {
        let chat = ChatConfig::default();
        assert_eq!(chat.timeout, Duration::from_secs(10));
        assert_eq!(chat.rate_limit_max_requests, 30);
        assert_eq!(chat.rate_limit_window, Duration::from_secs(60));
        assert_eq!(chat.max_output_tokens, 2048);
        assert!(!chat.trust_forwarded_headers);
    }

    #[test]
    fn debug_output_hides_api_key() {
        let chat = ChatConfig {
            api_key: Some("secret-key-value".to_string()),
            ..ChatConfig::default()
        };
        let rendered = format!("{chat:?}");
        assert!(!rendered.contains("secret-key-value"));
        assert!(rendered.contains("<redacted>"));
    }
}
