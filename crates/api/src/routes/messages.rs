use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use makerlink_shared::constants::{MAX_MESSAGE_PAGE_SIZE, MESSAGE_PAGE_SIZE};
use makerlink_shared::validation;

use crate::db::store::{self, ReactionAction};
use crate::error::ApiError;
use crate::models::{AuthUser, Chat};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "chatId")]
    pub chat_id: String,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
    pub action: Option<String>,
}

async fn load_chat_for(
    state: &AppState,
    chat_id: &str,
    user: &AuthUser,
) -> Result<Chat, ApiError> {
    let chat = store::get_chat(&state.db, chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".into()))?;
    if !chat.is_participant(&user.id) {
        return Err(ApiError::Forbidden("Not a participant of this chat".into()));
    }
    Ok(chat)
}

/// POST /api/chat/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_chat_id(&req.chat_id).map_err(ApiError::Validation)?;

    // Before any persistence
    state
        .rate_limiter
        .check(&user.id)
        .await
        .map_err(|retry_after_secs| ApiError::RateLimited { retry_after_secs })?;

    let chat = load_chat_for(&state, &req.chat_id, &user).await?;

    let content = req.content.unwrap_or_default();
    let image_url = req.image_url.filter(|u| !u.trim().is_empty());
    validation::validate_message_body(&content, image_url.as_deref())
        .map_err(ApiError::Validation)?;
    // Image-only sends keep a whitespace placeholder so content stays NOT NULL
    let content = if content.trim().is_empty() {
        " ".to_string()
    } else {
        content
    };

    let message =
        store::append_message(&state.db, &req.chat_id, &user.id, &content, image_url.as_deref())
            .await?;
    store::touch_chat(&state.db, &req.chat_id).await?;

    // Durable notification for the other participant; never fails the send.
    if let Some(recipient) = chat.other_participant(&user.id) {
        let db = state.db.clone();
        let sender_name = user.name.clone();
        let chat_id = req.chat_id.clone();
        tokio::spawn(async move {
            let body = format!("{} sent you a message", sender_name);
            if let Err(e) = store::create_notification(
                &db,
                &recipient,
                "message",
                "New message",
                &body,
                &format!("/chat/{}", chat_id),
            )
            .await
            {
                tracing::warn!("failed to create message notification: {}", e);
            }
        });
    }

    state
        .bridge
        .emit(&req.chat_id, "receive-message", json!({ "message": message }));

    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

/// GET /api/chat/messages?chatId&cursor&limit
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_chat_id(&query.chat_id).map_err(ApiError::Validation)?;
    load_chat_for(&state, &query.chat_id, &user).await?;

    let limit = query
        .limit
        .unwrap_or(MESSAGE_PAGE_SIZE)
        .clamp(1, MAX_MESSAGE_PAGE_SIZE);

    let (messages, has_more, next_cursor) =
        store::list_messages(&state.db, &query.chat_id, query.cursor.as_deref(), limit).await?;

    // Read-state catch-up is best-effort and must not add to fetch latency.
    let db = state.db.clone();
    let chat_id = query.chat_id.clone();
    let reader_id = user.id.clone();
    tokio::spawn(async move {
        if let Err(e) = store::mark_chat_read(&db, &chat_id, &reader_id).await {
            tracing::warn!("failed to mark chat {} read: {}", chat_id, e);
        }
    });

    Ok(Json(json!({
        "messages": messages,
        "pagination": {
            "hasMore": has_more,
            "nextCursor": next_cursor,
        },
    })))
}

/// POST /api/chat/messages/{messageId}/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let message = store::get_message(&state.db, &message_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Message not found".into()))?;
    load_chat_for(&state, &message.chat_id, &user).await?;

    let was_read = message.is_read;
    let updated = store::mark_read(&state.db, &message_id, &user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Message not found".into()))?;

    if updated.is_read && !was_read {
        state.bridge.emit(
            &updated.chat_id,
            "message-read",
            json!({
                "messageId": updated.id,
                "chatId": updated.chat_id,
                "readBy": updated.read_by,
                "readAt": updated.read_at,
            }),
        );
    }

    Ok(Json(json!({ "message": updated })))
}

/// POST /api/chat/messages/{messageId}/reactions
pub async fn toggle_reaction(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
    Json(req): Json<ReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_emoji(&req.emoji).map_err(ApiError::Validation)?;
    let action = match req.action.as_deref() {
        None => ReactionAction::Toggle,
        Some("add") => ReactionAction::Add,
        Some("remove") => ReactionAction::Remove,
        Some(other) => {
            return Err(ApiError::Validation(format!("Unknown action: {}", other)))
        }
    };

    let message = store::get_message(&state.db, &message_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Message not found".into()))?;
    load_chat_for(&state, &message.chat_id, &user).await?;

    let (reaction, reactions) =
        store::toggle_reaction(&state.db, &message_id, &user.id, &req.emoji, action).await?;

    state.bridge.emit(
        &message.chat_id,
        "message-reaction",
        json!({
            "messageId": message_id,
            "chatId": message.chat_id,
            "reaction": reaction,
            "reactions": reactions,
        }),
    );

    Ok(Json(json!({ "reaction": reaction, "reactions": reactions })))
}
