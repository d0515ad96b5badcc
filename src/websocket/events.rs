//! Outbound event definitions.
//!
//! Every event the service emits is a variant here, serialized in one place
//! with the same top-level structure:
//!
//! ```json
//! {
//!     "type": "chat:message",
//!     "timestamp": "2026-08-07T10:30:00Z",
//!     "stream_id": "uuid",
//!     ...event fields
//! }
//! ```
//!
//! Errors are delivered to the originating connection only and are never
//! broadcast to the room.

use crate::error::ChatError;
use crate::models::{ChatMessage, Identity, MessageKind};
use crate::websocket::pubsub::FanoutAdapter;
use crate::websocket::{ConnectionRegistry, SessionCommand};
use axum::extract::ws::Message;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Direct reply to a successful join.
    #[serde(rename = "stream:joined")]
    StreamJoined {
        viewer_count: u32,
        messages: Vec<ChatMessage>,
        moderators: Vec<Uuid>,
        slow_mode_seconds: u32,
        subscriber_only: bool,
    },

    #[serde(rename = "presence:joined")]
    PresenceJoined { user: Identity },

    #[serde(rename = "presence:left")]
    PresenceLeft { user_id: Uuid },

    #[serde(rename = "chat:message")]
    Chat {
        id: Uuid,
        user: Identity,
        text: String,
        kind: MessageKind,
    },

    #[serde(rename = "chat:superchat")]
    SuperChat {
        id: Uuid,
        user: Identity,
        text: String,
        amount: i64,
        currency: String,
        color: String,
        highlight_duration_seconds: u32,
    },

    /// Direct notice to the stream owner when a super chat lands.
    #[serde(rename = "chat:superchat:notice")]
    SuperChatNotice {
        id: Uuid,
        user: Identity,
        amount: i64,
        currency: String,
    },

    #[serde(rename = "chat:emote")]
    Emote { user: Identity, emote_id: String },

    /// Retraction carries only the id; clients reconcile against what they
    /// already rendered.
    #[serde(rename = "chat:message:deleted")]
    MessageDeleted { message_id: Uuid },

    #[serde(rename = "mod:slowmode")]
    SlowMode { enabled: bool, duration_seconds: u32 },

    #[serde(rename = "mod:subscriberonly")]
    SubscriberOnly { enabled: bool },

    /// Direct notice to a timed-out user.
    #[serde(rename = "mod:timeout")]
    TimeoutNotice { duration_seconds: u32 },

    /// Direct notice to a banned user.
    #[serde(rename = "mod:banned")]
    BanNotice,

    /// Direct error reply to the originating connection.
    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after_seconds: Option<i64>,
    },
}

impl ServerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StreamJoined { .. } => "stream:joined",
            Self::PresenceJoined { .. } => "presence:joined",
            Self::PresenceLeft { .. } => "presence:left",
            Self::Chat { .. } => "chat:message",
            Self::SuperChat { .. } => "chat:superchat",
            Self::SuperChatNotice { .. } => "chat:superchat:notice",
            Self::Emote { .. } => "chat:emote",
            Self::MessageDeleted { .. } => "chat:message:deleted",
            Self::SlowMode { .. } => "mod:slowmode",
            Self::SubscriberOnly { .. } => "mod:subscriberonly",
            Self::TimeoutNotice { .. } => "mod:timeout",
            Self::BanNotice => "mod:banned",
            Self::Error { .. } => "error",
        }
    }

    pub fn from_error(err: &ChatError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
            retry_after_seconds: err.retry_after_seconds(),
        }
    }

    /// Serialization happens here and nowhere else; handlers never build
    /// payload JSON by hand.
    pub fn to_payload_value(&self, stream_id: Uuid) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "timestamp".to_string(),
                serde_json::json!(Utc::now().to_rfc3339()),
            );
            map.insert("stream_id".to_string(), serde_json::json!(stream_id));
        }
        Ok(value)
    }

    pub fn to_payload(&self, stream_id: Uuid) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_payload_value(stream_id)?)
    }
}

/// Deliver a committed event to every viewer of a room: other processes via
/// the fanout adapter, local sessions via the registry. Publish failures are
/// logged and local delivery still proceeds.
pub async fn broadcast_event(
    registry: &ConnectionRegistry,
    fanout: &dyn FanoutAdapter,
    stream_id: Uuid,
    event: &ServerEvent,
) {
    let payload = match event.to_payload(stream_id) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(%stream_id, event = event.event_type(), error = %e, "failed to serialize event");
            return;
        }
    };

    if let Err(e) = fanout.publish(stream_id, &payload).await {
        tracing::warn!(%stream_id, event = event.event_type(), error = %e, "fanout publish failed, delivering locally only");
    }

    registry.broadcast(stream_id, Message::Text(payload)).await;
}

/// Deliver an event to a single session. Returns false if the session's
/// channel is gone.
pub fn send_to(
    sender: &UnboundedSender<SessionCommand>,
    stream_id: Uuid,
    event: &ServerEvent,
) -> bool {
    match event.to_payload(stream_id) {
        Ok(payload) => sender
            .send(SessionCommand::Deliver(Message::Text(payload)))
            .is_ok(),
        Err(e) => {
            tracing::error!(%stream_id, event = event.event_type(), error = %e, "failed to serialize direct event");
            false
        }
    }
}
