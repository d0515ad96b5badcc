use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod events;
pub mod handlers;
pub mod message_types;
pub mod pubsub;

/// Instruction delivered to a live session task through its command channel.
/// Moderation reaches running sessions this way instead of touching sockets.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Forward a frame to the client.
    Deliver(Message),
    /// The session was removed from a room by moderation; drop it from the
    /// session's local joined set.
    ForceLeave { stream_id: Uuid },
}

/// Local fanout table: stream id -> command senders of every session joined
/// to that room on this process.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Vec<(Uuid, UnboundedSender<SessionCommand>)>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(
        &self,
        stream_id: Uuid,
        connection_id: Uuid,
        sender: UnboundedSender<SessionCommand>,
    ) {
        let mut guard = self.inner.write().await;
        let senders = guard.entry(stream_id).or_default();
        senders.retain(|(id, _)| *id != connection_id);
        senders.push((connection_id, sender));
    }

    pub async fn remove(&self, stream_id: Uuid, connection_id: Uuid) {
        let mut guard = self.inner.write().await;
        if let Some(senders) = guard.get_mut(&stream_id) {
            senders.retain(|(id, _)| *id != connection_id);
            if senders.is_empty() {
                guard.remove(&stream_id);
            }
        }
    }

    pub async fn broadcast(&self, stream_id: Uuid, msg: Message) {
        let mut guard = self.inner.write().await;
        if let Some(senders) = guard.get_mut(&stream_id) {
            senders.retain(|(_, tx)| tx.send(SessionCommand::Deliver(msg.clone())).is_ok());
        }
    }

    pub async fn subscriber_count(&self, stream_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.get(&stream_id).map(Vec::len).unwrap_or(0)
    }
}
