//! Chat relay request body, documented for OpenAPI.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::chat::ChatMessage;

/// Request body for `POST /chat`.
///
/// The relay parses the raw body itself; this type only documents it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequestBody {
    /// Conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
}
