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

/// App with a three-messages-per-minute quota.
async fn setup_throttled() -> (TestServer, sqlx::SqlitePool, String, String, String) {
    let pool = common::setup_test_db().await;
    let mut config = common::test_config();
    config.rate_limit_max_messages = 3;
    let server = TestServer::new(common::create_test_app_with_config(pool.clone(), config)).unwrap();

    let (alice_id, alice_token) = common::create_test_user(&pool, "alice", "requester").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob", "designer").await;
    let chat_id = common::create_test_chat(&pool, &alice_id, &bob_id, "designer").await;

    (server, pool, alice_token, chat_id, alice_id)
}

#[tokio::test]
async fn quota_exhaustion_returns_too_many_requests() {
    let (server, pool, token, chat_id, _) = setup_throttled().await;

    for i in 0..3 {
        let (h, v) = auth_header(&token);
        server
            .post("/api/chat/messages")
            .add_header(h, v)
            .json(&json!({"chatId": chat_id, "content": format!("msg {}", i)}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "one too many"}))
        .await;

    res.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = res.json();
    assert!(body["retryAfter"].as_u64().is_some());
    assert!(res.maybe_header("retry-after").is_some());

    // The throttled send must not have been persisted
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
        .bind(&chat_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn quota_is_per_user() {
    let (server, pool, alice_token, chat_id, _) = setup_throttled().await;

    // Bob shares the chat but has his own bucket
    let bob_id = sqlx::query_scalar::<_, String>("SELECT designer_id FROM chats WHERE id = ?")
        .bind(&chat_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    let bob_token = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let expires = (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339();
    sqlx::query(
        r#"INSERT INTO "session" (id, user_id, token, expires_at, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&bob_id)
    .bind(&bob_token)
    .bind(&expires)
    .bind(&now)
    .execute(&pool)
    .await
    .unwrap();

    for i in 0..3 {
        let (h, v) = auth_header(&alice_token);
        server
            .post("/api/chat/messages")
            .add_header(h, v)
            .json(&json!({"chatId": chat_id, "content": format!("alice {}", i)}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let (h, v) = auth_header(&bob_token);
    let res = server
        .post("/api/chat/messages")
        .add_header(h, v)
        .json(&json!({"chatId": chat_id, "content": "bob still fine"}))
        .await;
    res.assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn fetches_are_not_throttled() {
    let (server, _pool, token, chat_id, _) = setup_throttled().await;

    // Well past the message quota; reads are never throttled
    for _ in 0..10 {
        let (h, v) = auth_header(&token);
        server
            .get(&format!("/api/chat/messages?chatId={}", chat_id))
            .add_header(h, v)
            .await
            .assert_status_ok();
    }
}
