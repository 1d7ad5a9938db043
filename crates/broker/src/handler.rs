use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use makerlink_shared::events::{ClientEvent, ServerEvent};

use crate::gateway::{ClientId, GatewayState};

/// WebSocket upgrade handler. Connections start anonymous; identity binds
/// on the first `register` event (the request tier authorized the caller
/// long before it handed out any chat id).
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(gateway): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, gateway))
}

async fn handle_socket(socket: WebSocket, gateway: Arc<GatewayState>) {
    let client_id = gateway.next_client_id().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Task to forward messages from mpsc to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive loop
    let gw = gateway.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => {
                    let text_str: &str = &text;
                    match serde_json::from_str::<ClientEvent>(text_str) {
                        Ok(event) => handle_client_event(&gw, client_id, &tx, event).await,
                        Err(_) => {
                            let err = ServerEvent::Error {
                                message: "Unrecognized event".into(),
                            };
                            if let Ok(frame) = serde_json::to_string(&err) {
                                let _ = tx.send(frame);
                            }
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    handle_disconnect(&gateway, client_id).await;
}

async fn handle_client_event(
    gateway: &Arc<GatewayState>,
    client_id: ClientId,
    tx: &mpsc::UnboundedSender<String>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Register { user_id, name, role } => {
            gateway
                .register(client_id, user_id.clone(), name.clone(), role, tx.clone())
                .await;

            gateway
                .broadcast_all(
                    &ServerEvent::UserOnline {
                        user_id: user_id.clone(),
                        name,
                    },
                    Some(client_id),
                )
                .await;

            // Presence snapshot so the newcomer converges without a fetch
            for (uid, uname) in gateway.online_users().await {
                if uid != user_id {
                    gateway
                        .send_to(
                            client_id,
                            &ServerEvent::UserOnline {
                                user_id: uid,
                                name: uname,
                            },
                        )
                        .await;
                }
            }
        }
        ClientEvent::JoinChat { chat_id } => {
            gateway.join_chat(client_id, &chat_id).await;
        }
        ClientEvent::LeaveChat { chat_id } => {
            gateway.leave_chat(client_id, &chat_id).await;
        }
        ClientEvent::Typing {
            chat_id,
            user_id,
            user_name,
        } => {
            relay_typing(gateway, client_id, chat_id, user_id, user_name, true).await;
        }
        ClientEvent::StopTyping {
            chat_id,
            user_id,
            user_name,
        } => {
            relay_typing(gateway, client_id, chat_id, user_id, user_name, false).await;
        }
        ClientEvent::Ping => {}
    }
}

/// Typing indicators reach the other room members only and are never
/// persisted anywhere.
async fn relay_typing(
    gateway: &Arc<GatewayState>,
    client_id: ClientId,
    chat_id: String,
    user_id: String,
    user_name: String,
    is_typing: bool,
) {
    gateway
        .broadcast_chat(
            &chat_id,
            &ServerEvent::UserTyping {
                chat_id: chat_id.clone(),
                user_id,
                user_name,
                is_typing,
            },
            Some(client_id),
        )
        .await;
}

async fn handle_disconnect(gateway: &Arc<GatewayState>, client_id: ClientId) {
    if let Some((client, was_last)) = gateway.unregister(client_id).await {
        if was_last {
            gateway
                .broadcast_all(
                    &ServerEvent::UserOffline {
                        user_id: client.user_id,
                    },
                    None,
                )
                .await;
        }
    }
}
