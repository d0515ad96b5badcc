//! Per-stream room state and its registry.
//!
//! All moderation policy lives in `Room` fields and is checked and mutated
//! under the room's mutex, before any awaited I/O. Rooms exist only while
//! they have local viewers; durable history lives behind the persistence
//! gateway and is reloaded when a room is recreated.

use crate::error::ChatError;
use crate::metrics;
use crate::models::{ChatMessage, Identity};
use crate::services::persistence::PersistenceGateway;
use crate::services::stream_directory::StreamDirectory;
use crate::websocket::pubsub::FanoutAdapter;
use crate::websocket::{events, events::ServerEvent, ConnectionRegistry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub mod presence;

pub use presence::{PresenceTracker, SessionHandle};

/// In-memory history kept per room.
pub const RECENT_MESSAGES_CAPACITY: usize = 100;
/// How much of that history a joining viewer receives.
pub const JOIN_SNAPSHOT_MESSAGES: usize = 50;

#[derive(Debug)]
pub struct Room {
    pub owner_id: Uuid,
    pub viewer_count: u32,
    recent_messages: VecDeque<ChatMessage>,
    pub moderators: HashSet<Uuid>,
    pub slow_mode_seconds: u32,
    pub subscriber_only: bool,
    pub banned_users: HashSet<Uuid>,
    pub timeouts: HashMap<Uuid, DateTime<Utc>>,
    pub last_message_at: HashMap<Uuid, DateTime<Utc>>,
}

/// What a joining viewer sees.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub viewer_count: u32,
    pub messages: Vec<ChatMessage>,
    pub moderators: Vec<Uuid>,
    pub slow_mode_seconds: u32,
    pub subscriber_only: bool,
}

impl Room {
    pub fn new(owner_id: Uuid) -> Self {
        let mut moderators = HashSet::new();
        moderators.insert(owner_id);
        Self {
            owner_id,
            viewer_count: 0,
            recent_messages: VecDeque::with_capacity(RECENT_MESSAGES_CAPACITY),
            moderators,
            slow_mode_seconds: 0,
            subscriber_only: false,
            banned_users: HashSet::new(),
            timeouts: HashMap::new(),
            last_message_at: HashMap::new(),
        }
    }

    pub fn is_moderator(&self, user_id: Uuid) -> bool {
        self.moderators.contains(&user_id)
    }

    /// Send-policy gate, in precedence order: ban, timeout, subscriber-only,
    /// slow mode. Short-circuits on the first violation; callers mutate
    /// nothing unless this returns Ok.
    pub fn check_send_policy(&self, user: &Identity, now: DateTime<Utc>) -> Result<(), ChatError> {
        if self.banned_users.contains(&user.id) {
            return Err(ChatError::Banned);
        }

        if let Some(expiry) = self.timeouts.get(&user.id) {
            if now < *expiry {
                return Err(ChatError::RateLimited {
                    remaining_seconds: (*expiry - now).num_seconds().max(1),
                });
            }
        }

        if self.subscriber_only && !user.verified {
            return Err(ChatError::Authorization);
        }

        if self.slow_mode_seconds > 0 {
            if let Some(last) = self.last_message_at.get(&user.id) {
                let elapsed = (now - *last).num_seconds();
                let window = i64::from(self.slow_mode_seconds);
                if elapsed < window {
                    return Err(ChatError::RateLimited {
                        remaining_seconds: window - elapsed,
                    });
                }
            }
        }

        Ok(())
    }

    pub fn record_message_time(&mut self, user_id: Uuid, now: DateTime<Utc>) {
        self.last_message_at.insert(user_id, now);
    }

    /// FIFO with capacity 100; the oldest entry is evicted first.
    pub fn push_message(&mut self, message: ChatMessage) {
        if self.recent_messages.len() == RECENT_MESSAGES_CAPACITY {
            self.recent_messages.pop_front();
        }
        self.recent_messages.push_back(message);
    }

    /// Seeds the buffer from durable history, oldest first.
    pub fn seed_history(&mut self, messages: Vec<ChatMessage>) {
        for message in messages {
            self.push_message(message);
        }
    }

    pub fn recent_messages(&self) -> &VecDeque<ChatMessage> {
        &self.recent_messages
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let skip = self
            .recent_messages
            .len()
            .saturating_sub(JOIN_SNAPSHOT_MESSAGES);
        RoomSnapshot {
            viewer_count: self.viewer_count,
            messages: self.recent_messages.iter().skip(skip).cloned().collect(),
            moderators: self.moderators.iter().copied().collect(),
            slow_mode_seconds: self.slow_mode_seconds,
            subscriber_only: self.subscriber_only,
        }
    }
}

/// Owns every room on this process. Join/leave lifecycle, viewer counting,
/// and presence bookkeeping all route through here.
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Room>>>>>,
    directory: Arc<dyn StreamDirectory>,
    persistence: Arc<dyn PersistenceGateway>,
    connections: ConnectionRegistry,
    presence: PresenceTracker,
    fanout: Arc<dyn FanoutAdapter>,
}

impl RoomRegistry {
    pub fn new(
        directory: Arc<dyn StreamDirectory>,
        persistence: Arc<dyn PersistenceGateway>,
        connections: ConnectionRegistry,
        presence: PresenceTracker,
        fanout: Arc<dyn FanoutAdapter>,
    ) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            directory,
            persistence,
            connections,
            presence,
            fanout,
        }
    }

    pub async fn get(&self, stream_id: Uuid) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(&stream_id).cloned()
    }

    /// Join a viewer to a stream's room, creating it on first local join.
    /// Fails without mutating anything when the stream is not live.
    pub async fn join(
        &self,
        stream_id: Uuid,
        identity: &Identity,
        session: SessionHandle,
    ) -> Result<RoomSnapshot, ChatError> {
        let stream = self
            .directory
            .live_stream(stream_id)
            .await
            .map_err(|e| ChatError::Internal(format!("stream lookup: {e}")))?
            .ok_or(ChatError::NotFound)?;

        let (room, created) = {
            let mut map = self.rooms.write().await;
            match map.entry(stream_id) {
                Entry::Occupied(entry) => (entry.get().clone(), false),
                Entry::Vacant(entry) => {
                    metrics::OPEN_ROOMS.inc();
                    let room = Arc::new(Mutex::new(Room::new(stream.owner_id)));
                    (entry.insert(room).clone(), true)
                }
            }
        };

        if created {
            match self
                .persistence
                .recent_messages(stream_id, RECENT_MESSAGES_CAPACITY as i64)
                .await
            {
                Ok(history) => room.lock().await.seed_history(history),
                Err(e) => {
                    tracing::warn!(%stream_id, error = %e, "failed to reload chat history")
                }
            }
        }

        self.presence.register(identity.id, session.clone()).await;
        self.connections
            .add(stream_id, session.connection_id, session.sender.clone())
            .await;

        let snapshot = {
            let mut room = room.lock().await;
            room.viewer_count += 1;
            room.snapshot()
        };
        metrics::CONNECTED_VIEWERS.inc();

        events::broadcast_event(
            &self.connections,
            self.fanout.as_ref(),
            stream_id,
            &ServerEvent::PresenceJoined {
                user: identity.clone(),
            },
        )
        .await;

        Ok(snapshot)
    }

    /// Remove a viewer from a room. The room itself is discarded once its
    /// local viewer count reaches zero.
    pub async fn leave(&self, stream_id: Uuid, user_id: Uuid, connection_id: Uuid) {
        self.connections.remove(stream_id, connection_id).await;

        let Some(room) = self.get(stream_id).await else {
            return;
        };

        let now_empty = {
            let mut room = room.lock().await;
            room.viewer_count = room.viewer_count.saturating_sub(1);
            room.viewer_count == 0
        };
        metrics::CONNECTED_VIEWERS.dec();

        if now_empty {
            let mut map = self.rooms.write().await;
            // re-check under the write lock; a join may have raced the drop
            let still_empty = match map.get(&stream_id) {
                Some(entry) => {
                    let entry = entry.clone();
                    let is_empty = entry.lock().await.viewer_count == 0;
                    is_empty
                }
                None => false,
            };
            if still_empty {
                map.remove(&stream_id);
                metrics::OPEN_ROOMS.dec();
            }
        }

        events::broadcast_event(
            &self.connections,
            self.fanout.as_ref(),
            stream_id,
            &ServerEvent::PresenceLeft { user_id },
        )
        .await;
    }

    /// Connection teardown: best-effort leave of every room the session had
    /// joined, then presence cleanup.
    pub async fn disconnect(&self, user_id: Uuid, connection_id: Uuid, joined: &HashSet<Uuid>) {
        for stream_id in joined {
            self.leave(*stream_id, user_id, connection_id).await;
        }
        self.presence.remove(user_id, connection_id).await;
    }

    /// Current local viewer counts, for periodic snapshots.
    pub async fn viewer_counts(&self) -> Vec<(Uuid, u32)> {
        let rooms: Vec<(Uuid, Arc<Mutex<Room>>)> = {
            let map = self.rooms.read().await;
            map.iter().map(|(id, room)| (*id, room.clone())).collect()
        };

        let mut counts = Vec::with_capacity(rooms.len());
        for (stream_id, room) in rooms {
            counts.push((stream_id, room.lock().await.viewer_count));
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn viewer(verified: bool) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            name: "viewer".into(),
            avatar: None,
            role: "viewer".into(),
            verified,
        }
    }

    fn message(room: Uuid, user: Uuid, text: &str, at: DateTime<Utc>) -> ChatMessage {
        ChatMessage::new(room, user, text.into(), crate::models::MessageKind::Message, at)
    }

    #[test]
    fn slow_mode_window_arithmetic() {
        let mut room = Room::new(Uuid::new_v4());
        room.slow_mode_seconds = 5;
        let user = viewer(false);
        let t0 = Utc::now();

        // t=0: first message accepted
        assert!(room.check_send_policy(&user, t0).is_ok());
        room.record_message_time(user.id, t0);

        // t=2: rejected with 3s remaining
        let err = room
            .check_send_policy(&user, t0 + Duration::seconds(2))
            .unwrap_err();
        match err {
            ChatError::RateLimited { remaining_seconds } => assert_eq!(remaining_seconds, 3),
            other => panic!("unexpected error: {other:?}"),
        }

        // t=6: accepted again
        assert!(room
            .check_send_policy(&user, t0 + Duration::seconds(6))
            .is_ok());
    }

    #[test]
    fn slow_mode_boundary_is_inclusive() {
        let mut room = Room::new(Uuid::new_v4());
        room.slow_mode_seconds = 5;
        let user = viewer(false);
        let t0 = Utc::now();
        room.record_message_time(user.id, t0);

        assert!(room
            .check_send_policy(&user, t0 + Duration::seconds(5))
            .is_ok());
    }

    #[test]
    fn timeout_rejects_strictly_before_expiry() {
        let mut room = Room::new(Uuid::new_v4());
        let user = viewer(false);
        let expiry = Utc::now() + Duration::seconds(60);
        room.timeouts.insert(user.id, expiry);

        assert!(matches!(
            room.check_send_policy(&user, expiry - Duration::seconds(1)),
            Err(ChatError::RateLimited { .. })
        ));
        assert!(room.check_send_policy(&user, expiry).is_ok());
        assert!(room
            .check_send_policy(&user, expiry + Duration::seconds(1))
            .is_ok());
    }

    #[test]
    fn ban_takes_precedence_over_everything() {
        let mut room = Room::new(Uuid::new_v4());
        room.slow_mode_seconds = 5;
        room.subscriber_only = true;
        let user = viewer(false);
        room.banned_users.insert(user.id);
        room.timeouts
            .insert(user.id, Utc::now() + Duration::seconds(60));

        assert!(matches!(
            room.check_send_policy(&user, Utc::now()),
            Err(ChatError::Banned)
        ));
    }

    #[test]
    fn subscriber_only_rejects_unverified() {
        let mut room = Room::new(Uuid::new_v4());
        room.subscriber_only = true;

        assert!(matches!(
            room.check_send_policy(&viewer(false), Utc::now()),
            Err(ChatError::Authorization)
        ));
        assert!(room.check_send_policy(&viewer(true), Utc::now()).is_ok());
    }

    #[test]
    fn buffer_evicts_oldest_past_capacity() {
        let stream_id = Uuid::new_v4();
        let mut room = Room::new(Uuid::new_v4());
        let user = Uuid::new_v4();
        let t0 = Utc::now();

        for i in 0..(RECENT_MESSAGES_CAPACITY + 5) {
            room.push_message(message(stream_id, user, &format!("m{i}"), t0));
        }

        assert_eq!(room.recent_messages().len(), RECENT_MESSAGES_CAPACITY);
        assert_eq!(room.recent_messages().front().unwrap().content, "m5");
        assert_eq!(
            room.recent_messages().back().unwrap().content,
            format!("m{}", RECENT_MESSAGES_CAPACITY + 4)
        );
    }

    #[test]
    fn snapshot_returns_last_fifty_in_order() {
        let stream_id = Uuid::new_v4();
        let mut room = Room::new(Uuid::new_v4());
        let user = Uuid::new_v4();
        let t0 = Utc::now();

        for i in 0..80 {
            room.push_message(message(stream_id, user, &format!("m{i}"), t0));
        }

        let snapshot = room.snapshot();
        assert_eq!(snapshot.messages.len(), JOIN_SNAPSHOT_MESSAGES);
        assert_eq!(snapshot.messages.first().unwrap().content, "m30");
        assert_eq!(snapshot.messages.last().unwrap().content, "m79");
    }

    #[test]
    fn owner_is_seeded_as_moderator() {
        let owner = Uuid::new_v4();
        let room = Room::new(owner);
        assert!(room.is_moderator(owner));
        assert!(!room.is_moderator(Uuid::new_v4()));
    }
}
