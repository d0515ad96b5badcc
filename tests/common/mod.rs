#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use live_chat_service::error::AppError;
use live_chat_service::models::{ChatMessage, Identity, SuperChat};
use live_chat_service::rooms::{PresenceTracker, RoomRegistry, RoomSnapshot, SessionHandle};
use live_chat_service::services::broadcaster::MessageBroadcaster;
use live_chat_service::services::content_filter::ContentFilter;
use live_chat_service::services::moderation::ModerationEngine;
use live_chat_service::services::persistence::PersistenceGateway;
use live_chat_service::services::stream_directory::{LiveStream, StreamDirectory};
use live_chat_service::services::super_chat::SuperChatProcessor;
use live_chat_service::websocket::pubsub::{FanoutAdapter, FanoutError};
use live_chat_service::websocket::{ConnectionRegistry, SessionCommand};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use uuid::Uuid;

/// In-memory stand-in for the durable store.
#[derive(Default)]
pub struct MemoryGateway {
    pub messages: Mutex<Vec<ChatMessage>>,
    pub super_chats: Mutex<Vec<SuperChat>>,
    pub snapshots: Mutex<Vec<(Uuid, u32)>>,
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), AppError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn mark_message_deleted(
        &self,
        message_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut messages = self.messages.lock().unwrap();
        for message in messages.iter_mut() {
            if message.id == message_id && message.deleted_at.is_none() {
                message.deleted_at = Some(deleted_at);
            }
        }
        Ok(())
    }

    async fn insert_super_chat(&self, super_chat: &SuperChat) -> Result<(), AppError> {
        self.super_chats.lock().unwrap().push(super_chat.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        stream_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let messages = self.messages.lock().unwrap();
        let matching: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.stream_id == stream_id && m.deleted_at.is_none())
            .cloned()
            .collect();
        let skip = matching.len().saturating_sub(limit as usize);
        Ok(matching.into_iter().skip(skip).collect())
    }

    async fn record_viewer_count(
        &self,
        stream_id: Uuid,
        viewer_count: u32,
        _recorded_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.snapshots.lock().unwrap().push((stream_id, viewer_count));
        Ok(())
    }
}

/// Fixed stream catalog.
pub struct StaticDirectory {
    streams: HashMap<Uuid, LiveStream>,
}

#[async_trait]
impl StreamDirectory for StaticDirectory {
    async fn live_stream(&self, stream_id: Uuid) -> Result<Option<LiveStream>, AppError> {
        Ok(self.streams.get(&stream_id).copied())
    }
}

/// Single-process fanout: tests only observe local delivery.
pub struct NoopFanout;

#[async_trait]
impl FanoutAdapter for NoopFanout {
    async fn publish(&self, _stream_id: Uuid, _payload: &str) -> Result<(), FanoutError> {
        Ok(())
    }
}

pub struct TestApp {
    pub rooms: Arc<RoomRegistry>,
    pub broadcaster: MessageBroadcaster,
    pub moderation: ModerationEngine,
    pub super_chats: SuperChatProcessor,
    pub gateway: Arc<MemoryGateway>,
    pub presence: PresenceTracker,
    pub connections: ConnectionRegistry,
}

impl TestApp {
    pub fn new(live: &[LiveStream]) -> Self {
        Self::with_blocked_terms(live, &["noob"])
    }

    pub fn with_blocked_terms(live: &[LiveStream], terms: &[&str]) -> Self {
        let gateway = Arc::new(MemoryGateway::default());
        let directory = Arc::new(StaticDirectory {
            streams: live.iter().map(|s| (s.id, *s)).collect(),
        });
        let fanout: Arc<dyn FanoutAdapter> = Arc::new(NoopFanout);
        let connections = ConnectionRegistry::new();
        let presence = PresenceTracker::new();
        let filter = Arc::new(ContentFilter::new(
            &terms.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
        ));

        let rooms = Arc::new(RoomRegistry::new(
            directory,
            gateway.clone(),
            connections.clone(),
            presence.clone(),
            fanout.clone(),
        ));
        let broadcaster = MessageBroadcaster::new(
            rooms.clone(),
            connections.clone(),
            gateway.clone(),
            fanout.clone(),
            filter.clone(),
        );
        let moderation = ModerationEngine::new(
            rooms.clone(),
            connections.clone(),
            presence.clone(),
            gateway.clone(),
            fanout.clone(),
        );
        let super_chats = SuperChatProcessor::new(
            rooms.clone(),
            connections.clone(),
            presence.clone(),
            gateway.clone(),
            fanout.clone(),
            filter,
        );

        Self {
            rooms,
            broadcaster,
            moderation,
            super_chats,
            gateway,
            presence,
            connections,
        }
    }

    pub async fn join(
        &self,
        stream_id: Uuid,
        identity: &Identity,
    ) -> (SessionHandle, UnboundedReceiver<SessionCommand>, RoomSnapshot) {
        let (handle, rx) = session();
        let snapshot = self
            .rooms
            .join(stream_id, identity, handle.clone())
            .await
            .expect("join failed");
        (handle, rx, snapshot)
    }
}

pub fn session() -> (SessionHandle, UnboundedReceiver<SessionCommand>) {
    let (tx, rx) = unbounded_channel();
    (
        SessionHandle {
            connection_id: Uuid::new_v4(),
            sender: tx,
        },
        rx,
    )
}

pub fn identity(name: &str, verified: bool) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        name: name.to_string(),
        avatar: None,
        role: "viewer".to_string(),
        verified,
    }
}

pub fn live_stream(owner_id: Uuid) -> LiveStream {
    LiveStream {
        id: Uuid::new_v4(),
        owner_id,
    }
}

/// Drains every frame delivered to a session so far, parsed as JSON.
pub fn drain_events(rx: &mut UnboundedReceiver<SessionCommand>) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    while let Ok(command) = rx.try_recv() {
        if let SessionCommand::Deliver(axum::extract::ws::Message::Text(text)) = command {
            events.push(serde_json::from_str(&text).expect("event payload is not JSON"));
        }
    }
    events
}

/// Drains raw session commands, including force-leaves.
pub fn drain_commands(rx: &mut UnboundedReceiver<SessionCommand>) -> Vec<SessionCommand> {
    let mut commands = Vec::new();
    while let Ok(command) = rx.try_recv() {
        commands.push(command);
    }
    commands
}

pub fn events_of_type<'a>(
    events: &'a [serde_json::Value],
    event_type: &str,
) -> Vec<&'a serde_json::Value> {
    events
        .iter()
        .filter(|e| e["type"] == event_type)
        .collect()
}
