//! Chat relay: a guarded proxy in front of the upstream completion API.
//!
//! Requests pass through [`relay::ChatRelay`], which applies the method and
//! content-type checks, the per-caller [`rate_limiter::SlidingWindowLimiter`],
//! message validation and [`sanitize`]-ation, reshapes the conversation
//! ([`messages::reshape`]) and normalizes whatever the upstream returns
//! ([`normalize::normalize`]).

pub mod messages;
pub mod normalize;
pub mod rate_limiter;
pub mod relay;
pub mod sanitize;
pub mod upstream;

pub use messages::{ChatMessage, GenerateRequest, GenerationConfig, Role};
pub use normalize::ChatCompletion;
pub use rate_limiter::SlidingWindowLimiter;
pub use relay::{ChatRelay, ChatRequest, client_key};
pub use upstream::{CompletionClient, GeminiClient, UpstreamFailure};
