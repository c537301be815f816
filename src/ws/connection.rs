//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered activity.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::{ParsedIds, SubscriptionManager};
use crate::api::dto::EventDto;
use crate::domain::{ActivityEvent, EventId};
use crate::service::EventService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and answers them.
/// - Forwards activity of followed events from the [`broadcast::Receiver`].
pub async fn run_connection(
    socket: WebSocket,
    mut activity_rx: broadcast::Receiver<ActivityEvent>,
    events: Arc<EventService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(&text, &mut subs, &events).await;
                        if let Ok(json) = serde_json::to_string(&reply)
                            && ws_tx.send(Message::text(json)).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    _ => {}
                }
            }
            activity = activity_rx.recv() => {
                match activity {
                    Ok(activity) => {
                        if !subs.matches(activity.event_id()) {
                            continue;
                        }
                        let msg = WsMessage::new(
                            uuid::Uuid::new_v4().to_string(),
                            WsMessageType::Event,
                            serde_json::to_value(&activity).unwrap_or_default(),
                        );
                        let json = serde_json::to_string(&msg).unwrap_or_default();
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind activity bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Parses a client text frame into its request id and command.
///
/// # Errors
///
/// Returns the error reply to send back for malformed JSON or an unknown
/// command.
pub fn parse_command(text: &str) -> Result<(String, WsCommand), WsMessage> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return Err(WsMessage::error(String::new(), 400, "malformed JSON"));
    };
    match serde_json::from_value::<WsCommand>(msg.payload) {
        Ok(command) => Ok((msg.id, command)),
        Err(_) => Err(WsMessage::error(msg.id, 404, "unknown command")),
    }
}

/// Answers one client frame, updating the subscription set.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    events: &EventService,
) -> WsMessage {
    let (id, command) = match parse_command(text) {
        Ok(parsed) => parsed,
        Err(reply) => return reply,
    };

    match command {
        WsCommand::Subscribe { event_ids } => {
            let parsed = ParsedIds::parse(&event_ids);
            subs.subscribe(&parsed.ids, parsed.wildcard);
            WsMessage::new(
                id,
                WsMessageType::Response,
                serde_json::json!({
                    "subscribed": ids_to_strings(&parsed.ids),
                    "rejected": parsed.rejected,
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::Unsubscribe { event_ids } => {
            let parsed = ParsedIds::parse(&event_ids);
            subs.unsubscribe(&parsed.ids, parsed.wildcard);
            WsMessage::new(
                id,
                WsMessageType::Response,
                serde_json::json!({
                    "unsubscribed": ids_to_strings(&parsed.ids),
                    "remaining_count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::GetEvent { event_id } => {
            let Ok(uuid) = event_id.parse::<uuid::Uuid>() else {
                return WsMessage::error(id, 400, "invalid event id");
            };
            match events.get_event(EventId::from_uuid(uuid)).await {
                Ok(event) => WsMessage::new(
                    id,
                    WsMessageType::Response,
                    serde_json::to_value(EventDto::from(event)).unwrap_or_default(),
                ),
                Err(e) => WsMessage::error(id, e.status_code().as_u16(), &e.to_string()),
            }
        }
    }
}

fn ids_to_strings(ids: &[EventId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn envelope(payload: serde_json::Value) -> String {
        serde_json::json!({
            "id": "req-1",
            "type": "command",
            "timestamp": "2025-06-01T09:00:00Z",
            "payload": payload,
        })
        .to_string()
    }

    #[test]
    fn parses_subscribe() {
        let text = envelope(serde_json::json!({"command": "subscribe", "event_ids": ["*"]}));
        let Ok((id, command)) = parse_command(&text) else {
            panic!("subscribe rejected");
        };
        assert_eq!(id, "req-1");
        assert_eq!(
            command,
            WsCommand::Subscribe {
                event_ids: vec!["*".to_string()]
            }
        );
    }

    #[test]
    fn malformed_json_is_400() {
        let Err(reply) = parse_command("{not json") else {
            panic!("garbage accepted");
        };
        assert_eq!(reply.msg_type, WsMessageType::Error);
        assert_eq!(reply.payload["code"], 400);
    }

    #[test]
    fn unknown_command_is_404_and_keeps_id() {
        let text = envelope(serde_json::json!({"command": "swap"}));
        let Err(reply) = parse_command(&text) else {
            panic!("unknown command accepted");
        };
        assert_eq!(reply.id, "req-1");
        assert_eq!(reply.payload["code"], 404);
    }
}
