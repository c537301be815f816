//! Chat message validation and reshaping into the upstream request format.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::sanitize::sanitize_value;
use crate::error::HubError;

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// End-user turn.
    User,
    /// Previous model turn.
    Assistant,
}

impl Role {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One validated, sanitized chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Text content.
    pub content: String,
}

/// Generation parameters sent upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token cap.
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2048,
        }
    }
}

/// Text fragment of an upstream turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    /// Text.
    pub text: String,
}

/// One upstream turn; `role` is `"user"` or `"model"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    /// Upstream role.
    pub role: &'static str,
    /// Fragments.
    pub parts: Vec<Part>,
}

/// Upstream `generateContent` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Conversation turns.
    pub contents: Vec<Content>,
    /// Generation parameters.
    pub generation_config: GenerationConfig,
}

/// Parses the request body, validates `messages` and sanitizes it.
///
/// Every element must be an object with a `role` of `system`, `user` or
/// `assistant` and a string `content`.
///
/// # Errors
///
/// Returns [`HubError::InvalidRequest`] for a body that is not JSON or a
/// malformed message list.
pub fn parse_messages(body: &[u8]) -> Result<Vec<ChatMessage>, HubError> {
    let request: Value = serde_json::from_slice(body)
        .map_err(|_| HubError::InvalidRequest("invalid request body".to_string()))?;

    let Some(Value::Array(items)) = request.get("messages") else {
        return Err(invalid_format());
    };
    if !items.iter().all(is_valid_message) {
        return Err(invalid_format());
    }

    let Value::Array(items) = sanitize_value(Value::Array(items.clone())) else {
        return Err(invalid_format());
    };
    items
        .iter()
        .map(|item| {
            let role = item
                .get("role")
                .and_then(Value::as_str)
                .and_then(Role::parse)
                .ok_or_else(invalid_format)?;
            let content = item
                .get("content")
                .and_then(Value::as_str)
                .ok_or_else(invalid_format)?;
            Ok(ChatMessage {
                role,
                content: content.to_string(),
            })
        })
        .collect()
}

fn is_valid_message(item: &Value) -> bool {
    let Some(object) = item.as_object() else {
        return false;
    };
    let role_ok = object
        .get("role")
        .and_then(Value::as_str)
        .is_some_and(|r| Role::parse(r).is_some());
    let content_ok = object.get("content").is_some_and(Value::is_string);
    role_ok && content_ok
}

fn invalid_format() -> HubError {
    HubError::InvalidRequest("invalid messages format".to_string())
}

/// Builds the upstream request.
///
/// System turns are not sent on their own: the last non-empty one is
/// prepended, followed by a blank line, to the first user turn. Assistant
/// turns become `model` turns.
#[must_use]
pub fn reshape(messages: &[ChatMessage], generation_config: GenerationConfig) -> GenerateRequest {
    let system_prompt = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .filter(|s| !s.is_empty());

    let mut prompt_pending = system_prompt;
    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let text = match (m.role, prompt_pending.take()) {
                (Role::User, Some(prompt)) => format!("{prompt}\n\n{}", m.content),
                (Role::User, None) => m.content.clone(),
                (_, pending) => {
                    prompt_pending = pending;
                    m.content.clone()
                }
            };
            Content {
                role: if m.role == Role::Assistant { "model" } else { "user" },
                parts: vec![Part { text }],
            }
        })
        .collect();

    GenerateRequest {
        contents,
        generation_config,
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(role: Role, content: &str) -> ChatMessage {
        ChatMessage {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn rejects_unknown_role() {
        let body = json!({"messages": [{"role": "bogus", "content": "hi"}]}).to_string();
        assert!(matches!(
            parse_messages(body.as_bytes()),
            Err(HubError::InvalidRequest(_))
        ));
    }

    #[test]
    fn rejects_non_string_content_and_missing_list() {
        let numeric = json!({"messages": [{"role": "user", "content": 5}]}).to_string();
        assert!(parse_messages(numeric.as_bytes()).is_err());
        let missing = json!({"prompt": "hi"}).to_string();
        assert!(parse_messages(missing.as_bytes()).is_err());
        assert!(parse_messages(b"not json").is_err());
    }

    #[test]
    fn sanitizes_content() {
        let body = json!({"messages": [{"role": "user", "content": "<script>"}]}).to_string();
        let Ok(messages) = parse_messages(body.as_bytes()) else {
            panic!("valid body rejected");
        };
        assert_eq!(messages, vec![msg(Role::User, "&lt;script&gt;")]);
    }

    #[test]
    fn system_prompt_joins_first_user_turn() {
        let messages = [
            msg(Role::System, "Be brief."),
            msg(Role::Assistant, "Hello!"),
            msg(Role::User, "What is on today?"),
            msg(Role::User, "Thanks"),
        ];
        let request = reshape(&messages, GenerationConfig::default());
        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0].role, "model");
        assert_eq!(request.contents[0].parts[0].text, "Hello!");
        assert_eq!(request.contents[1].role, "user");
        assert_eq!(
            request.contents[1].parts[0].text,
            "Be brief.\n\nWhat is on today?"
        );
        assert_eq!(request.contents[2].parts[0].text, "Thanks");
    }

    #[test]
    fn last_system_prompt_wins() {
        let messages = [
            msg(Role::System, "first"),
            msg(Role::System, "second"),
            msg(Role::User, "hi"),
        ];
        let request = reshape(&messages, GenerationConfig::default());
        assert_eq!(request.contents[0].parts[0].text, "second\n\nhi");
    }

    #[test]
    fn request_serializes_in_upstream_shape() {
        let request = reshape(&[msg(Role::User, "hi")], GenerationConfig::default());
        let Ok(value) = serde_json::to_value(&request) else {
            panic!("serialization failed");
        };
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 2048);
    }
}
