use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{AuthUser, Chat};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub user_id: String,
}

/// POST /api/chats — create or return the chat between the current user and
/// another user. A chat always pairs a requester with one maker (designer or
/// fabricator); the participant set is fixed at creation.
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let other = sqlx::query_as::<_, (String, String, String)>(
        r#"SELECT id, name, role FROM "user" WHERE id = ?"#,
    )
    .bind(&req.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let (other_id, _other_name, other_role) = other;
    if other_id == user.id {
        return Err(ApiError::Validation("Cannot open a chat with yourself".into()));
    }

    let (requester_id, maker_id, maker_role) = match (user.role.as_str(), other_role.as_str()) {
        ("requester", "designer") | ("requester", "fabricator") => {
            (user.id.clone(), other_id.clone(), other_role.clone())
        }
        ("designer", "requester") | ("fabricator", "requester") => {
            (other_id.clone(), user.id.clone(), user.role.clone())
        }
        _ => {
            return Err(ApiError::Validation(
                "A chat pairs a requester with a designer or fabricator".into(),
            ))
        }
    };

    let maker_column = if maker_role == "designer" {
        "designer_id"
    } else {
        "fabricator_id"
    };

    let existing = sqlx::query_as::<_, Chat>(&format!(
        "SELECT * FROM chats WHERE requester_id = ? AND {} = ?",
        maker_column
    ))
    .bind(&requester_id)
    .bind(&maker_id)
    .fetch_optional(&state.db)
    .await?;

    if let Some(chat) = existing {
        return Ok(Json(json!({ "chat": chat })));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(&format!(
        "INSERT INTO chats (id, requester_id, {}, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        maker_column
    ))
    .bind(&id)
    .bind(&requester_id)
    .bind(&maker_id)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let chat = store_fetch(&state, &id).await?;
    Ok(Json(json!({ "chat": chat })))
}

async fn store_fetch(state: &AppState, chat_id: &str) -> Result<Chat, ApiError> {
    crate::db::store::get_chat(&state.db, chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".into()))
}

/// GET /api/chats — the current user's chats, most recently active first,
/// with the other participant summarized for list rendering.
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let chats = sqlx::query_as::<_, Chat>(
        r#"SELECT * FROM chats
           WHERE requester_id = ? OR designer_id = ? OR fabricator_id = ?
           ORDER BY updated_at DESC"#,
    )
    .bind(&user.id)
    .bind(&user.id)
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    // Batch-resolve the other participants
    let other_ids: Vec<String> = chats
        .iter()
        .filter_map(|c| c.other_participant(&user.id))
        .collect();

    let mut users: HashMap<String, (String, String)> = HashMap::new();
    if !other_ids.is_empty() {
        let placeholders: Vec<String> = other_ids.iter().map(|_| "?".to_string()).collect();
        let sql = format!(
            r#"SELECT id, name, role FROM "user" WHERE id IN ({})"#,
            placeholders.join(",")
        );
        let mut query = sqlx::query_as::<_, (String, String, String)>(&sql);
        for id in &other_ids {
            query = query.bind(id);
        }
        for (id, name, role) in query.fetch_all(&state.db).await? {
            users.insert(id, (name, role));
        }
    }

    let items: Vec<serde_json::Value> = chats
        .into_iter()
        .map(|chat| {
            let other = chat.other_participant(&user.id).and_then(|id| {
                users
                    .get(&id)
                    .map(|(name, role)| json!({"id": id, "name": name, "role": role}))
            });
            json!({
                "id": chat.id,
                "updatedAt": chat.updated_at,
                "createdAt": chat.created_at,
                "otherUser": other,
            })
        })
        .collect();

    Ok(Json(items))
}
