use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Message,
    SuperChat,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Message => "MESSAGE",
            MessageKind::SuperChat => "SUPER_CHAT",
            MessageKind::System => "SYSTEM",
        }
    }

    /// Stored rows with an unrecognized kind degrade to plain messages.
    pub fn parse(value: &str) -> MessageKind {
        match value {
            "SUPER_CHAT" => MessageKind::SuperChat,
            "SYSTEM" => MessageKind::System,
            _ => MessageKind::Message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

impl ChatMessage {
    pub fn new(
        stream_id: Uuid,
        user_id: Uuid,
        content: String,
        kind: MessageKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream_id,
            user_id,
            content,
            kind,
            created_at,
            deleted_at: None,
            metadata: None,
        }
    }
}
