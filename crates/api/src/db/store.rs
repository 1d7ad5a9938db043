//! Durable message/reaction/read-state operations. This module is the only
//! writer of chat state in the whole system; the broker never touches the
//! database.

use sqlx::SqlitePool;

use crate::models::{Chat, Message, Reaction};

/// How the reactions endpoint should treat an existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAction {
    Add,
    Remove,
    Toggle,
}

pub async fn get_chat(db: &SqlitePool, chat_id: &str) -> Result<Option<Chat>, sqlx::Error> {
    sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = ?")
        .bind(chat_id)
        .fetch_optional(db)
        .await
}

pub async fn get_message(
    db: &SqlitePool,
    message_id: &str,
) -> Result<Option<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
        .bind(message_id)
        .fetch_optional(db)
        .await
}

pub async fn append_message(
    db: &SqlitePool,
    chat_id: &str,
    sender_id: &str,
    content: &str,
    image_url: Option<&str>,
) -> Result<Message, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO messages (id, chat_id, sender_id, content, image_url, is_read, created_at)
           VALUES (?, ?, ?, ?, ?, 0, ?)"#,
    )
    .bind(&id)
    .bind(chat_id)
    .bind(sender_id)
    .bind(content)
    .bind(image_url)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Message {
        id,
        chat_id: chat_id.to_string(),
        sender_id: sender_id.to_string(),
        content: content.to_string(),
        image_url: image_url.map(str::to_string),
        is_read: false,
        read_at: None,
        read_by: None,
        created_at: now,
    })
}

/// Bump the chat's recency ordering. Called on every successful send.
pub async fn touch_chat(db: &SqlitePool, chat_id: &str) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(chat_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Mark a single message read. No-op (returns the current row) if the
/// message is already read or the reader is its sender; read state only
/// ever moves false -> true.
pub async fn mark_read(
    db: &SqlitePool,
    message_id: &str,
    reader_id: &str,
) -> Result<Option<Message>, sqlx::Error> {
    let msg = match get_message(db, message_id).await? {
        Some(m) => m,
        None => return Ok(None),
    };

    if msg.is_read || msg.sender_id == reader_id {
        return Ok(Some(msg));
    }

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE messages SET is_read = 1, read_at = ?, read_by = ? WHERE id = ? AND is_read = 0",
    )
    .bind(&now)
    .bind(reader_id)
    .bind(message_id)
    .execute(db)
    .await?;

    get_message(db, message_id).await
}

/// Bulk catch-up used by the fetch side effect: everything the other
/// participant sent becomes read. Returns the number of rows flipped.
pub async fn mark_chat_read(
    db: &SqlitePool,
    chat_id: &str,
    reader_id: &str,
) -> Result<u64, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"UPDATE messages SET is_read = 1, read_at = ?, read_by = ?
           WHERE chat_id = ? AND sender_id != ? AND is_read = 0"#,
    )
    .bind(&now)
    .bind(reader_id)
    .bind(chat_id)
    .bind(reader_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

pub async fn message_reactions(
    db: &SqlitePool,
    message_id: &str,
) -> Result<Vec<Reaction>, sqlx::Error> {
    sqlx::query_as::<_, Reaction>(
        "SELECT * FROM reactions WHERE message_id = ? ORDER BY created_at, id",
    )
    .bind(message_id)
    .fetch_all(db)
    .await
}

/// Add/remove/toggle a reaction. The UNIQUE(message_id, user_id, emoji)
/// constraint is the only guard against concurrent duplicate inserts: a
/// violation means another call won the race and is treated as "already
/// existed". Always returns the full reaction list so callers publish a
/// consistent snapshot, not a delta.
pub async fn toggle_reaction(
    db: &SqlitePool,
    message_id: &str,
    user_id: &str,
    emoji: &str,
    action: ReactionAction,
) -> Result<(Option<Reaction>, Vec<Reaction>), sqlx::Error> {
    let existing = sqlx::query_as::<_, Reaction>(
        "SELECT * FROM reactions WHERE message_id = ? AND user_id = ? AND emoji = ?",
    )
    .bind(message_id)
    .bind(user_id)
    .bind(emoji)
    .fetch_optional(db)
    .await?;

    let outcome = match (existing, action) {
        (Some(_), ReactionAction::Remove) | (Some(_), ReactionAction::Toggle) => {
            sqlx::query("DELETE FROM reactions WHERE message_id = ? AND user_id = ? AND emoji = ?")
                .bind(message_id)
                .bind(user_id)
                .bind(emoji)
                .execute(db)
                .await?;
            None
        }
        (Some(reaction), ReactionAction::Add) => Some(reaction),
        (None, ReactionAction::Remove) => None,
        (None, ReactionAction::Add) | (None, ReactionAction::Toggle) => {
            let reaction = Reaction {
                id: uuid::Uuid::new_v4().to_string(),
                message_id: message_id.to_string(),
                user_id: user_id.to_string(),
                emoji: emoji.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            let inserted = sqlx::query(
                r#"INSERT INTO reactions (id, message_id, user_id, emoji, created_at)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(&reaction.id)
            .bind(&reaction.message_id)
            .bind(&reaction.user_id)
            .bind(&reaction.emoji)
            .bind(&reaction.created_at)
            .execute(db)
            .await;

            match inserted {
                Ok(_) => Some(reaction),
                Err(e) if is_unique_violation(&e) => {
                    // A concurrent toggle inserted the same triple first.
                    sqlx::query_as::<_, Reaction>(
                        "SELECT * FROM reactions WHERE message_id = ? AND user_id = ? AND emoji = ?",
                    )
                    .bind(message_id)
                    .bind(user_id)
                    .bind(emoji)
                    .fetch_optional(db)
                    .await?
                }
                Err(e) => return Err(e),
            }
        }
    };

    let all = message_reactions(db, message_id).await?;
    Ok((outcome, all))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Newest-first page anchored at a message-id cursor, reversed to
/// chronological order before returning. The cursor is resolved to its
/// (created_at, id) pair so pages stay stable under concurrent inserts.
pub async fn list_messages(
    db: &SqlitePool,
    chat_id: &str,
    cursor: Option<&str>,
    limit: i64,
) -> Result<(Vec<Message>, bool, Option<String>), sqlx::Error> {
    let items = match cursor {
        Some(cursor_id) => {
            let anchor = sqlx::query_as::<_, (String, String)>(
                "SELECT created_at, id FROM messages WHERE id = ?",
            )
            .bind(cursor_id)
            .fetch_optional(db)
            .await?;

            match anchor {
                Some((ts, id)) => {
                    sqlx::query_as::<_, Message>(
                        r#"SELECT * FROM messages
                           WHERE chat_id = ? AND (created_at < ? OR (created_at = ? AND id < ?))
                           ORDER BY created_at DESC, id DESC LIMIT ?"#,
                    )
                    .bind(chat_id)
                    .bind(&ts)
                    .bind(&ts)
                    .bind(&id)
                    .bind(limit + 1)
                    .fetch_all(db)
                    .await?
                }
                // Stale cursor (message deleted): nothing older to return.
                None => Vec::new(),
            }
        }
        None => {
            sqlx::query_as::<_, Message>(
                r#"SELECT * FROM messages WHERE chat_id = ?
                   ORDER BY created_at DESC, id DESC LIMIT ?"#,
            )
            .bind(chat_id)
            .bind(limit + 1)
            .fetch_all(db)
            .await?
        }
    };

    let has_more = items.len() as i64 > limit;
    let mut items = items;
    if has_more {
        items.pop();
    }
    items.reverse(); // chronological order

    let next_cursor = if has_more {
        items.first().map(|m| m.id.clone())
    } else {
        None
    };

    Ok((items, has_more, next_cursor))
}

pub async fn create_notification(
    db: &SqlitePool,
    user_id: &str,
    kind: &str,
    title: &str,
    message: &str,
    link: &str,
) -> Result<(), sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO notifications (id, user_id, type, title, message, link, is_read, created_at)
           VALUES (?, ?, ?, ?, ?, ?, 0, ?)"#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(message)
    .bind(link)
    .bind(&now)
    .execute(db)
    .await?;
    Ok(())
}
