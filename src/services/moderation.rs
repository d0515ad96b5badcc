use crate::error::ChatError;
use crate::models::Identity;
use crate::rooms::{PresenceTracker, RoomRegistry};
use crate::services::persistence::PersistenceGateway;
use crate::websocket::pubsub::FanoutAdapter;
use crate::websocket::{events, events::ServerEvent, ConnectionRegistry, SessionCommand};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Room moderation commands. Every operation requires the acting identity to
/// be in the room's moderator set and performs no mutation otherwise.
/// Decisions are process-local; only the resulting broadcasts travel across
/// instances.
pub struct ModerationEngine {
    rooms: Arc<RoomRegistry>,
    connections: ConnectionRegistry,
    presence: PresenceTracker,
    persistence: Arc<dyn PersistenceGateway>,
    fanout: Arc<dyn FanoutAdapter>,
}

impl ModerationEngine {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        connections: ConnectionRegistry,
        presence: PresenceTracker,
        persistence: Arc<dyn PersistenceGateway>,
        fanout: Arc<dyn FanoutAdapter>,
    ) -> Self {
        Self {
            rooms,
            connections,
            presence,
            persistence,
            fanout,
        }
    }

    /// Suspends a user's posting until now + duration. The target keeps its
    /// connection; it just cannot post.
    pub async fn timeout(
        &self,
        stream_id: Uuid,
        actor: &Identity,
        target: Uuid,
        duration_seconds: u32,
    ) -> Result<(), ChatError> {
        let room = self.rooms.get(stream_id).await.ok_or(ChatError::NotFound)?;
        {
            let mut room = room.lock().await;
            if !room.is_moderator(actor.id) {
                return Err(ChatError::Authorization);
            }
            room.timeouts
                .insert(target, Utc::now() + Duration::seconds(i64::from(duration_seconds)));
        }

        if let Some(handle) = self.presence.get(target).await {
            events::send_to(
                &handle.sender,
                stream_id,
                &ServerEvent::TimeoutNotice { duration_seconds },
            );
        }
        Ok(())
    }

    /// Bans a user for the lifetime of the room and forces any live session
    /// of theirs out of it.
    pub async fn ban(
        &self,
        stream_id: Uuid,
        actor: &Identity,
        target: Uuid,
    ) -> Result<(), ChatError> {
        let room = self.rooms.get(stream_id).await.ok_or(ChatError::NotFound)?;
        {
            let mut room = room.lock().await;
            if !room.is_moderator(actor.id) {
                return Err(ChatError::Authorization);
            }
            room.banned_users.insert(target);
        }

        if let Some(handle) = self.presence.get(target).await {
            self.rooms
                .leave(stream_id, target, handle.connection_id)
                .await;
            let _ = handle.sender.send(SessionCommand::ForceLeave { stream_id });
            events::send_to(&handle.sender, stream_id, &ServerEvent::BanNotice);
        }
        Ok(())
    }

    /// Soft-deletes a stored message and broadcasts a retraction carrying
    /// only the id. The in-memory buffer is left alone; clients reconcile.
    pub async fn delete_message(
        &self,
        stream_id: Uuid,
        actor: &Identity,
        message_id: Uuid,
    ) -> Result<(), ChatError> {
        let room = self.rooms.get(stream_id).await.ok_or(ChatError::NotFound)?;
        {
            let room = room.lock().await;
            if !room.is_moderator(actor.id) {
                return Err(ChatError::Authorization);
            }
        }

        self.persistence
            .mark_message_deleted(message_id, Utc::now())
            .await
            .map_err(|e| ChatError::Internal(format!("delete message: {e}")))?;

        events::broadcast_event(
            &self.connections,
            self.fanout.as_ref(),
            stream_id,
            &ServerEvent::MessageDeleted { message_id },
        )
        .await;
        Ok(())
    }

    /// 0 disables slow mode. The new window is broadcast so clients can show
    /// a countdown.
    pub async fn set_slow_mode(
        &self,
        stream_id: Uuid,
        actor: &Identity,
        duration_seconds: u32,
    ) -> Result<(), ChatError> {
        let room = self.rooms.get(stream_id).await.ok_or(ChatError::NotFound)?;
        {
            let mut room = room.lock().await;
            if !room.is_moderator(actor.id) {
                return Err(ChatError::Authorization);
            }
            room.slow_mode_seconds = duration_seconds;
        }

        events::broadcast_event(
            &self.connections,
            self.fanout.as_ref(),
            stream_id,
            &ServerEvent::SlowMode {
                enabled: duration_seconds > 0,
                duration_seconds,
            },
        )
        .await;
        Ok(())
    }

    /// While set, unverified identities are rejected at send time.
    pub async fn set_subscriber_only(
        &self,
        stream_id: Uuid,
        actor: &Identity,
        enabled: bool,
    ) -> Result<(), ChatError> {
        let room = self.rooms.get(stream_id).await.ok_or(ChatError::NotFound)?;
        {
            let mut room = room.lock().await;
            if !room.is_moderator(actor.id) {
                return Err(ChatError::Authorization);
            }
            room.subscriber_only = enabled;
        }

        events::broadcast_event(
            &self.connections,
            self.fanout.as_ref(),
            stream_id,
            &ServerEvent::SubscriberOnly { enabled },
        )
        .await;
        Ok(())
    }
}
