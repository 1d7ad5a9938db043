use serde::{Deserialize, Serialize};

/// A chat message as it travels over the wire. REST responses and
/// `receive-message` relay frames share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub image_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub read_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionEntry {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: String,
}

// ── Client → Broker Events ──

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    Register {
        #[serde(rename = "userId")]
        user_id: String,
        name: String,
        role: String,
    },
    JoinChat {
        #[serde(rename = "chatId")]
        chat_id: String,
    },
    LeaveChat {
        #[serde(rename = "chatId")]
        chat_id: String,
    },
    Typing {
        #[serde(rename = "chatId")]
        chat_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
    },
    StopTyping {
        #[serde(rename = "chatId")]
        chat_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
    },
    Ping,
}

// ── Broker → Client Events ──
//
// `receive-message`, `message-reaction` and `message-read` originate in the
// request tier and reach the broker through `POST /emit`; the broker stamps
// the event name into the payload and fans the frame out untouched.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    UserOnline {
        #[serde(rename = "userId")]
        user_id: String,
        name: String,
    },
    UserOffline {
        #[serde(rename = "userId")]
        user_id: String,
    },
    UserTyping {
        #[serde(rename = "chatId")]
        chat_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    ReceiveMessage {
        message: ChatMessage,
    },
    MessageReaction {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "chatId")]
        chat_id: String,
        reaction: Option<ReactionEntry>,
        reactions: Vec<ReactionEntry>,
    },
    MessageRead {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "chatId")]
        chat_id: String,
        #[serde(rename = "readBy")]
        read_by: String,
        #[serde(rename = "readAt")]
        read_at: String,
    },
    Error {
        message: String,
    },
}

// ── Request tier → Broker bridge ──

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitRequest {
    pub chat_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitResponse {
    pub success: bool,
    pub client_count: usize,
}
