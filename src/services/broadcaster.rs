use crate::error::ChatError;
use crate::metrics;
use crate::models::{ChatMessage, Identity, MessageKind};
use crate::rooms::RoomRegistry;
use crate::services::content_filter::ContentFilter;
use crate::services::persistence::PersistenceGateway;
use crate::websocket::pubsub::FanoutAdapter;
use crate::websocket::{events, events::ServerEvent, ConnectionRegistry};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Accepts chat messages: policy gate, content filter, persist, fan out.
/// The policy check and the state it guards are one atomic step under the
/// room lock; persistence and fanout happen after the lock is released.
pub struct MessageBroadcaster {
    rooms: Arc<RoomRegistry>,
    connections: ConnectionRegistry,
    persistence: Arc<dyn PersistenceGateway>,
    fanout: Arc<dyn FanoutAdapter>,
    filter: Arc<ContentFilter>,
}

impl MessageBroadcaster {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        connections: ConnectionRegistry,
        persistence: Arc<dyn PersistenceGateway>,
        fanout: Arc<dyn FanoutAdapter>,
        filter: Arc<ContentFilter>,
    ) -> Self {
        Self {
            rooms,
            connections,
            persistence,
            fanout,
            filter,
        }
    }

    pub async fn submit_message(
        &self,
        stream_id: Uuid,
        identity: &Identity,
        raw_text: &str,
    ) -> Result<(), ChatError> {
        let now = Utc::now();
        let room = self.rooms.get(stream_id).await.ok_or(ChatError::NotFound)?;

        let message = {
            let mut room = room.lock().await;
            room.check_send_policy(identity, now)?;

            let content = self.filter.apply(raw_text);
            let message =
                ChatMessage::new(stream_id, identity.id, content, MessageKind::Message, now);
            room.push_message(message.clone());
            room.record_message_time(identity.id, now);
            message
        };

        // Viewers already see the message; a failed write is logged, not
        // rolled back.
        if let Err(e) = self.persistence.insert_message(&message).await {
            tracing::error!(%stream_id, message_id = %message.id, error = %e, "failed to persist chat message");
        }

        metrics::CHAT_MESSAGES_TOTAL.inc();
        events::broadcast_event(
            &self.connections,
            self.fanout.as_ref(),
            stream_id,
            &ServerEvent::Chat {
                id: message.id,
                user: identity.clone(),
                text: message.content.clone(),
                kind: MessageKind::Message,
            },
        )
        .await;

        Ok(())
    }

    /// Emotes are ephemeral: no persistence, no policy beyond the room
    /// existing locally.
    pub async fn submit_emote(
        &self,
        stream_id: Uuid,
        identity: &Identity,
        emote_id: &str,
    ) -> Result<(), ChatError> {
        self.rooms.get(stream_id).await.ok_or(ChatError::NotFound)?;

        events::broadcast_event(
            &self.connections,
            self.fanout.as_ref(),
            stream_id,
            &ServerEvent::Emote {
                user: identity.clone(),
                emote_id: emote_id.to_string(),
            },
        )
        .await;

        Ok(())
    }
}
