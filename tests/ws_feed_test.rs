//! WebSocket activity feed against a live server.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let (state, _) = common::test_state(true);
    let app = volunteer_hub::build_app(state);
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn post_json(http: &reqwest::Client, url: String, body: Value) -> Value {
    let Ok(response) = http.post(url).json(&body).send().await else {
        panic!("request failed");
    };
    let Ok(json) = response.json::<Value>().await else {
        panic!("response not JSON");
    };
    json
}

async fn next_json(ws: &mut Socket) -> Value {
    loop {
        let Ok(Some(Ok(frame))) = tokio::time::timeout(Duration::from_secs(5), ws.next()).await
        else {
            panic!("no frame received");
        };
        if let Message::Text(text) = frame {
            let Ok(json) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("frame not JSON");
            };
            return json;
        }
    }
}

async fn send_command(ws: &mut Socket, payload: Value) {
    let envelope = json!({
        "id": "req-1",
        "type": "command",
        "timestamp": "2025-06-01T09:00:00Z",
        "payload": payload,
    });
    if ws.send(Message::text(envelope.to_string())).await.is_err() {
        panic!("send failed");
    }
}

#[tokio::test]
async fn subscriber_sees_live_seat_counts() {
    let addr = spawn_server().await;
    let http = reqwest::Client::new();
    let base = format!("http://{addr}/api/v1");

    let volunteer = post_json(
        &http,
        format!("{base}/volunteers"),
        json!({"name": "ana", "email": "ana@example.org"}),
    )
    .await;
    let event = post_json(
        &http,
        format!("{base}/events"),
        json!({
            "title": "Tree planting",
            "start_time": "2025-06-02T09:00:00Z",
            "end_time": "2025-06-02T12:00:00Z",
            "max_participants": 4,
            "category": "environment",
            "hours": 3,
            "organizer_id": "6f1c2a3e-0000-4000-8000-000000000001",
        }),
    )
    .await;
    let Some(event_id) = event["id"].as_str() else {
        panic!("event not created: {event}");
    };

    let Ok((mut ws, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws connect failed");
    };
    send_command(
        &mut ws,
        json!({"command": "subscribe", "event_ids": [event_id]}),
    )
    .await;
    let ack = next_json(&mut ws).await;
    assert_eq!(ack["type"], "response");
    assert_eq!(ack["payload"]["count"], 1);

    post_json(
        &http,
        format!("{base}/events/{event_id}/registrations"),
        json!({"volunteer_id": volunteer["id"]}),
    )
    .await;

    let activity = next_json(&mut ws).await;
    assert_eq!(activity["type"], "event");
    assert_eq!(activity["payload"]["activity_type"], "participant_registered");
    assert_eq!(activity["payload"]["event_id"], event_id);
    assert_eq!(activity["payload"]["current_participants"], 1);
    assert_eq!(activity["payload"]["max_participants"], 4);

    send_command(&mut ws, json!({"command": "get_event", "event_id": event_id})).await;
    let snapshot = next_json(&mut ws).await;
    assert_eq!(snapshot["payload"]["seats_left"], 3);
}

#[tokio::test]
async fn unknown_command_gets_an_error_frame() {
    let addr = spawn_server().await;
    let Ok((mut ws, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws connect failed");
    };
    send_command(&mut ws, json!({"command": "swap"})).await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["code"], 404);
}
