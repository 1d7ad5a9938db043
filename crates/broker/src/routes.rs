use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use makerlink_shared::events::{EmitRequest, EmitResponse};

use crate::gateway::GatewayState;
use crate::handler;

pub fn build_router(gateway: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/emit", post(emit))
        .route("/gateway", get(handler::ws_handler))
        .with_state(gateway)
}

/// POST /emit — bridge ingress from the request tier. The event name is
/// stamped into the payload and the frame fans out verbatim; the broker
/// computes nothing from it. `clientCount` is diagnostic, not a delivery
/// guarantee.
pub async fn emit(
    State(gateway): State<Arc<GatewayState>>,
    Json(req): Json<EmitRequest>,
) -> impl IntoResponse {
    if req.chat_id.trim().is_empty() || req.event.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "clientCount": 0})),
        )
            .into_response();
    }

    let frame = match req.payload {
        Value::Object(mut map) => {
            map.insert("type".into(), Value::String(req.event.clone()));
            Value::Object(map)
        }
        other => json!({ "type": req.event, "payload": other }),
    };

    let client_count = gateway
        .broadcast_chat_raw(&req.chat_id, &frame.to_string(), None)
        .await;

    tracing::debug!(event = %req.event, chat = %req.chat_id, clients = client_count, "relayed");

    Json(EmitResponse {
        success: true,
        client_count,
    })
    .into_response()
}
