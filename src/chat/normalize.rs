//! Upstream payload shape detection.
//!
//! Completion payloads arrive in several shapes. Each shape has a pure
//! matcher; [`extract_content`] tries them in a fixed priority order and
//! falls back to [`FALLBACK_MESSAGE`].

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Returned when no matcher recognises the payload.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I could not process the response from the AI service.";

/// Returned when a candidate carries content without any text.
pub const EMPTY_CANDIDATE_MESSAGE: &str = "No response generated";

/// Properties scanned by the last-resort matcher, in order.
const SCANNED_PROPS: [&str; 6] = ["text", "content", "message", "answer", "response", "result"];

type Matcher = fn(&Value) -> Option<String>;

/// Shape matchers in priority order.
const MATCHERS: [(&str, Matcher); 6] = [
    ("choices", openai_choice),
    ("candidates", gemini_candidate),
    ("response", response_field),
    ("text_or_content", text_or_content_field),
    ("plain_string", plain_string),
    ("property_scan", property_scan),
];

/// Normalized relay response: `{choices:[{message:{role, content}}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChatCompletion {
    /// Always exactly one choice.
    pub choices: Vec<ChatChoice>,
}

/// One completion choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChatChoice {
    /// The assistant message.
    pub message: AssistantMessage,
}

/// Assistant message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AssistantMessage {
    /// Always `"assistant"`.
    #[schema(value_type = String)]
    pub role: &'static str,
    /// Message text.
    pub content: String,
}

impl ChatCompletion {
    /// Wraps `content` as the single assistant choice.
    #[must_use]
    pub fn assistant(content: String) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: AssistantMessage {
                    role: "assistant",
                    content,
                },
            }],
        }
    }
}

/// Extracts the message text from any supported payload shape.
#[must_use]
pub fn extract_content(payload: &Value) -> String {
    for (shape, matcher) in MATCHERS {
        if let Some(content) = matcher(payload) {
            tracing::debug!(shape, "upstream payload matched");
            return content;
        }
    }
    tracing::warn!("unrecognised upstream payload shape");
    FALLBACK_MESSAGE.to_string()
}

/// Normalizes a payload into a [`ChatCompletion`].
#[must_use]
pub fn normalize(payload: &Value) -> ChatCompletion {
    ChatCompletion::assistant(extract_content(payload))
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_part_text(value: &Value) -> Option<String> {
    non_empty(value.get("parts").and_then(|p| p.get(0)).and_then(|p| p.get("text")))
}

fn openai_choice(payload: &Value) -> Option<String> {
    let message = payload.get("choices")?.get(0)?.get("message")?;
    non_empty(message.get("content"))
}

fn gemini_candidate(payload: &Value) -> Option<String> {
    let content = payload.get("candidates")?.get(0)?.get("content")?;
    if content.is_null() {
        return None;
    }
    Some(first_part_text(content).unwrap_or_else(|| EMPTY_CANDIDATE_MESSAGE.to_string()))
}

fn response_field(payload: &Value) -> Option<String> {
    non_empty(payload.get("response"))
}

fn text_or_content_field(payload: &Value) -> Option<String> {
    non_empty(payload.get("text")).or_else(|| non_empty(payload.get("content")))
}

fn plain_string(payload: &Value) -> Option<String> {
    non_empty(Some(payload))
}

fn property_scan(payload: &Value) -> Option<String> {
    SCANNED_PROPS.iter().find_map(|prop| {
        let value = payload.get(*prop)?;
        if value.is_string() {
            return non_empty(Some(value));
        }
        non_empty(value.get("content"))
            .or_else(|| non_empty(value.get("text")))
            .or_else(|| non_empty(value.get("message").and_then(|m| m.get("content"))))
            .or_else(|| first_part_text(value))
    })
}
