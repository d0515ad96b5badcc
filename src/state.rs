use crate::config::Config;
use crate::rooms::{PresenceTracker, RoomRegistry};
use crate::services::broadcaster::MessageBroadcaster;
use crate::services::identity::IdentityVerifier;
use crate::services::moderation::ModerationEngine;
use crate::services::super_chat::SuperChatProcessor;
use crate::websocket::ConnectionRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connections: ConnectionRegistry,
    pub presence: PresenceTracker,
    pub rooms: Arc<RoomRegistry>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub broadcaster: Arc<MessageBroadcaster>,
    pub moderation: Arc<ModerationEngine>,
    pub super_chats: Arc<SuperChatProcessor>,
}
