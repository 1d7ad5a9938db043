use axum::Router;
use makerlink_api::{config::Config, db, routes, AppState};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

/// Create an in-memory SQLite pool with schema applied.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();

    db::apply_schema(&pool).await.unwrap();

    pool
}

/// Config pointing the bridge at a dead port: emits are fire-and-forget, so
/// requests must succeed with no broker listening. The rate limit is set high
/// so ordinary tests never trip it.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_path: ":memory:".into(),
        broker_url: "http://127.0.0.1:1".into(),
        bridge_timeout_ms: 200,
        rate_limit_window_secs: 60,
        rate_limit_max_messages: 1000,
    }
}

pub fn create_test_app(pool: SqlitePool) -> Router {
    create_test_app_with_config(pool, test_config())
}

pub fn create_test_app_with_config(pool: SqlitePool, config: Config) -> Router {
    routes::build_router(Arc::new(AppState::new(pool, config)))
}

/// Create a test user directly in the database. Returns (user_id, session_token).
pub async fn create_test_user(pool: &SqlitePool, name: &str, role: &str) -> (String, String) {
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(r#"INSERT INTO "user" (id, name, role, created_at) VALUES (?, ?, ?, ?)"#)
        .bind(&user_id)
        .bind(name)
        .bind(role)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();

    let token = uuid::Uuid::new_v4().to_string();
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(30)).to_rfc3339();
    sqlx::query(
        r#"INSERT INTO "session" (id, user_id, token, expires_at, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&token)
    .bind(&expires_at)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    (user_id, token)
}

/// Create a chat pairing a requester with a maker. `maker_role` is
/// "designer" or "fabricator".
pub async fn create_test_chat(
    pool: &SqlitePool,
    requester_id: &str,
    maker_id: &str,
    maker_role: &str,
) -> String {
    let chat_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let maker_column = if maker_role == "designer" {
        "designer_id"
    } else {
        "fabricator_id"
    };

    sqlx::query(&format!(
        "INSERT INTO chats (id, requester_id, {}, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        maker_column
    ))
    .bind(&chat_id)
    .bind(requester_id)
    .bind(maker_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    chat_id
}

/// Insert a message row directly, bypassing the API.
#[allow(dead_code)]
pub async fn insert_message(
    pool: &SqlitePool,
    chat_id: &str,
    sender_id: &str,
    content: &str,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO messages (id, chat_id, sender_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(chat_id)
    .bind(sender_id)
    .bind(content)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    id
}
