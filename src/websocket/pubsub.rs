use crate::websocket::ConnectionRegistry;
use async_trait::async_trait;
use axum::extract::ws::Message;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialize: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Cross-process delivery of already-committed events. Moderation decisions
/// stay process-local; only broadcast payloads travel through here.
#[async_trait]
pub trait FanoutAdapter: Send + Sync {
    async fn publish(&self, stream_id: Uuid, payload: &str) -> Result<(), FanoutError>;
}

fn channel_for_room(stream_id: Uuid) -> String {
    format!("chat:room:{stream_id}")
}

/// Envelope published to Redis. The origin instance id lets the publishing
/// process skip its own messages, which it already delivered locally.
#[derive(Debug, Serialize, Deserialize)]
struct FanoutEnvelope {
    origin: Uuid,
    stream_id: Uuid,
    payload: String,
}

#[derive(Clone)]
pub struct RedisFanout {
    client: redis::Client,
    instance_id: Uuid,
}

impl RedisFanout {
    pub fn new(client: redis::Client, instance_id: Uuid) -> Self {
        Self {
            client,
            instance_id,
        }
    }
}

#[async_trait]
impl FanoutAdapter for RedisFanout {
    async fn publish(&self, stream_id: Uuid, payload: &str) -> Result<(), FanoutError> {
        let envelope = serde_json::to_string(&FanoutEnvelope {
            origin: self.instance_id,
            stream_id,
            payload: payload.to_string(),
        })?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.publish::<_, _, ()>(channel_for_room(stream_id), envelope)
            .await?;
        Ok(())
    }
}

pub async fn start_pubsub_listener(
    client: redis::Client,
    instance_id: Uuid,
    registry: ConnectionRegistry,
) -> redis::RedisResult<()> {
    // PubSub requires a dedicated connection, not multiplexed
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe("chat:room:*").await?;
    let mut stream = pubsub.on_message();
    use futures_util::StreamExt;
    while let Some(msg) = stream.next().await {
        let raw: String = msg.get_payload()?;
        let envelope: FanoutEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed fanout envelope");
                continue;
            }
        };
        if envelope.origin == instance_id {
            continue;
        }
        registry
            .broadcast(envelope.stream_id, Message::Text(envelope.payload))
            .await;
    }
    Ok(())
}
