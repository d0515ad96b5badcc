use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of commands a client may send. Unknown `type` values fail to
/// parse and are answered with a validation error, never silently routed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "join:stream")]
    JoinStream { stream_id: Uuid },

    #[serde(rename = "leave:stream")]
    LeaveStream { stream_id: Uuid },

    #[serde(rename = "chat:message")]
    ChatMessage { stream_id: Uuid, text: String },

    #[serde(rename = "chat:superchat")]
    SuperChat {
        stream_id: Uuid,
        text: String,
        amount: i64,
        currency: String,
    },

    #[serde(rename = "chat:emote")]
    Emote { stream_id: Uuid, emote_id: String },

    #[serde(rename = "mod:timeout")]
    Timeout {
        stream_id: Uuid,
        user_id: Uuid,
        duration_seconds: u32,
    },

    #[serde(rename = "mod:ban")]
    Ban { stream_id: Uuid, user_id: Uuid },

    #[serde(rename = "mod:delete")]
    Delete { stream_id: Uuid, message_id: Uuid },

    #[serde(rename = "mod:slow")]
    SlowMode {
        stream_id: Uuid,
        duration_seconds: u32,
    },

    #[serde(rename = "mod:subscribers")]
    SubscriberOnly { stream_id: Uuid, enabled: bool },
}

impl ClientCommand {
    /// The room a command addresses, for error reporting back to the sender.
    pub fn stream_id(&self) -> Uuid {
        match self {
            ClientCommand::JoinStream { stream_id }
            | ClientCommand::LeaveStream { stream_id }
            | ClientCommand::ChatMessage { stream_id, .. }
            | ClientCommand::SuperChat { stream_id, .. }
            | ClientCommand::Emote { stream_id, .. }
            | ClientCommand::Timeout { stream_id, .. }
            | ClientCommand::Ban { stream_id, .. }
            | ClientCommand::Delete { stream_id, .. }
            | ClientCommand::SlowMode { stream_id, .. }
            | ClientCommand::SubscriberOnly { stream_id, .. } => *stream_id,
        }
    }
}
