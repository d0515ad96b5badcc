use crate::websocket::SessionCommand;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Handle to a live session: the connection id plus its command channel.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub connection_id: Uuid,
    pub sender: UnboundedSender<SessionCommand>,
}

/// user id -> active session, last-connection-wins. Used for direct notices
/// and forced leaves; cleaned up when the owning connection drops.
#[derive(Default, Clone)]
pub struct PresenceTracker {
    inner: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session for a user, overwriting any previous connection.
    pub async fn register(&self, user_id: Uuid, handle: SessionHandle) {
        self.inner.write().await.insert(user_id, handle);
    }

    /// Removes the mapping only if it still belongs to this connection; a
    /// newer connection that already took over is left alone.
    pub async fn remove(&self, user_id: Uuid, connection_id: Uuid) {
        let mut guard = self.inner.write().await;
        if guard
            .get(&user_id)
            .is_some_and(|h| h.connection_id == connection_id)
        {
            guard.remove(&user_id);
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Option<SessionHandle> {
        self.inner.read().await.get(&user_id).cloned()
    }
}
