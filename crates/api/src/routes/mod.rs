pub mod chats;
pub mod messages;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Chats
        .route("/chats", post(chats::create_chat))
        .route("/chats", get(chats::list_chats))
        // Messages
        .route("/chat/messages", post(messages::send_message))
        .route("/chat/messages", get(messages::list_messages))
        .route("/chat/messages/{messageId}/read", post(messages::mark_read))
        .route(
            "/chat/messages/{messageId}/reactions",
            post(messages::toggle_reaction),
        );

    Router::new().nest("/api", api_routes).with_state(state)
}
