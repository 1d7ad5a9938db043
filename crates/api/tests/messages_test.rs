mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;

fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        format!("Bearer {}", token).parse().unwrap(),
    )
}

/// App + a requester/designer pair sharing one chat.
async fn setup_with_chat() -> (TestServer, sqlx::SqlitePool, String, String, String, String, String) {
    let pool = common::setup_test_db().await;
    let server = TestServer::new(common::create_test_app(pool.clone())).unwrap();

    let (alice_id, alice_token) = common::create_test_user(&pool, "alice", "requester").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob", "designer").await;
    let chat_id = common::create_test_chat(&pool, &alice_id, &bob_id, "designer").await;

    (server, pool, alice_id, alice_token, bob_id, bob_token, chat_id)
}

#[tokio::test]
async fn send_message_persists_and_returns_created() {
    let (server, pool, alice_id, token, _, _, chat_id) = setup_with_chat().await;

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "hello bob"}))
        .await;

    res.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = res.json();
    assert_eq!(body["message"]["content"], "hello bob");
    assert_eq!(body["message"]["senderId"], alice_id);
    assert_eq!(body["message"]["isRead"], false);
    assert!(body["message"]["id"].as_str().is_some());

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
        .bind(&chat_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn send_succeeds_with_broker_unreachable() {
    // The fixture bridge points at a dead port; delivery is fire-and-forget
    // and must never fail the HTTP request.
    let (server, _pool, _, token, _, _, chat_id) = setup_with_chat().await;

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "no broker today"}))
        .await;

    res.assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn image_only_send_keeps_placeholder_content() {
    let (server, pool, _, token, _, _, chat_id) = setup_with_chat().await;

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "imageUrl": "https://cdn.test/sketch.png"}))
        .await;

    res.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = res.json();
    assert_eq!(body["message"]["imageUrl"], "https://cdn.test/sketch.png");

    let content =
        sqlx::query_scalar::<_, String>("SELECT content FROM messages WHERE chat_id = ?")
            .bind(&chat_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(content, " ");
}

#[tokio::test]
async fn empty_message_without_image_rejected() {
    let (server, pool, _, token, _, _, chat_id) = setup_with_chat().await;

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "   "}))
        .await;

    res.assert_status(StatusCode::BAD_REQUEST);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn oversized_message_rejected() {
    let (server, _pool, _, token, _, _, chat_id) = setup_with_chat().await;

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "x".repeat(4001)}))
        .await;

    res.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_to_unknown_chat_is_not_found() {
    let (server, _pool, _, token, _, _, _) = setup_with_chat().await;

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": "no-such-chat", "content": "hello"}))
        .await;

    res.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_participant_cannot_send() {
    let (server, pool, _, _, _, _, chat_id) = setup_with_chat().await;
    let (_, mallory_token) = common::create_test_user(&pool, "mallory", "fabricator").await;

    let (h, v) = auth_header(&mallory_token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "let me in"}))
        .await;

    res.assert_status(StatusCode::FORBIDDEN);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0, "Forbidden send must leave no partial state");
}

#[tokio::test]
async fn send_without_token_is_unauthorized() {
    let (server, _pool, _, _, _, _, chat_id) = setup_with_chat().await;

    let res = server
        .post("/api/chat/messages")
        .json(&json!({"chatId": chat_id, "content": "anonymous"}))
        .await;

    res.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn send_creates_notification_for_other_participant() {
    let (server, pool, _, token, bob_id, _, chat_id) = setup_with_chat().await;

    let (h, v) = auth_header(&token);
    server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "ping"}))
        .await
        .assert_status(StatusCode::CREATED);

    // Notification creation is spawned off the request path
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND type = 'message'",
    )
    .bind(&bob_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn send_bumps_chat_updated_at() {
    let (server, pool, _, token, _, _, chat_id) = setup_with_chat().await;

    let before = sqlx::query_scalar::<_, String>("SELECT updated_at FROM chats WHERE id = ?")
        .bind(&chat_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let (h, v) = auth_header(&token);
    server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "bump"}))
        .await
        .assert_status(StatusCode::CREATED);

    let after = sqlx::query_scalar::<_, String>("SELECT updated_at FROM chats WHERE id = ?")
        .bind(&chat_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(after > before, "Sending should refresh chat recency");
}

#[tokio::test]
async fn expired_session_is_unauthorized() {
    let (server, pool, alice_id, _, _, _, chat_id) = setup_with_chat().await;

    let token = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let expired = (chrono::Utc::now() - chrono::Duration::days(1)).to_rfc3339();
    sqlx::query(
        r#"INSERT INTO "session" (id, user_id, token, expires_at, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&alice_id)
    .bind(&token)
    .bind(&expired)
    .bind(&now)
    .execute(&pool)
    .await
    .unwrap();

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "stale"}))
        .await;

    res.assert_status(StatusCode::UNAUTHORIZED);
}
