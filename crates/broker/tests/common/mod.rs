use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use makerlink_broker::gateway::GatewayState;
use makerlink_broker::routes;

pub type Ws = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Start a broker on a random TCP port and return its host:port.
pub async fn start_broker() -> String {
    let gateway = Arc::new(GatewayState::new());
    let app = routes::build_router(gateway);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    format!("127.0.0.1:{}", addr.port())
}

pub async fn ws_connect(addr: &str) -> Ws {
    let (ws, _) = connect_async(&format!("ws://{}/gateway", addr)).await.unwrap();
    ws
}

pub async fn send_json(ws: &mut Ws, value: &Value) {
    ws.send(Message::Text(serde_json::to_string(value).unwrap().into()))
        .await
        .unwrap();
}

/// Connect and register in one step, settled enough for the presence
/// broadcast to have gone out.
pub async fn connect_registered(addr: &str, user_id: &str, name: &str, role: &str) -> Ws {
    let mut ws = ws_connect(addr).await;
    send_json(
        &mut ws,
        &json!({"type": "register", "userId": user_id, "name": name, "role": role}),
    )
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    ws
}

/// Read next text message parsed as JSON, with timeout.
#[allow(dead_code)]
pub async fn recv_json(ws: &mut Ws) -> Option<Value> {
    let timeout = tokio::time::timeout(std::time::Duration::from_secs(3), ws.next()).await;
    match timeout {
        Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

/// Drain all pending messages until timeout.
pub async fn drain_messages(ws: &mut Ws) -> Vec<Value> {
    let mut messages = Vec::new();
    loop {
        let timeout =
            tokio::time::timeout(std::time::Duration::from_millis(200), ws.next()).await;
        match timeout {
            Ok(Some(Ok(Message::Text(text)))) => {
                if let Ok(v) = serde_json::from_str::<Value>(&text) {
                    messages.push(v);
                }
            }
            _ => break,
        }
    }
    messages
}

/// POST a relay frame through the bridge endpoint.
#[allow(dead_code)]
pub async fn emit(addr: &str, chat_id: &str, event: &str, payload: Value) -> Value {
    reqwest::Client::new()
        .post(format!("http://{}/emit", addr))
        .json(&json!({"chatId": chat_id, "event": event, "payload": payload}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}
