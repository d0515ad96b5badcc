use crate::error::ChatError;
use crate::metrics;
use crate::models::{ChatMessage, Identity, MessageKind, SuperChat};
use crate::rooms::{PresenceTracker, RoomRegistry};
use crate::services::content_filter::ContentFilter;
use crate::services::persistence::PersistenceGateway;
use crate::websocket::pubsub::FanoutAdapter;
use crate::websocket::{events, events::ServerEvent, ConnectionRegistry};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierSpec {
    pub color: &'static str,
    pub highlight_duration_seconds: u32,
}

/// Visual tier by amount in the smallest currency unit. Lower bounds are
/// inclusive.
pub fn tier_for_amount(amount: i64) -> TierSpec {
    match amount {
        a if a >= 50_000 => TierSpec {
            color: "#F57C00",
            highlight_duration_seconds: 300,
        },
        a if a >= 10_000 => TierSpec {
            color: "#00E5FF",
            highlight_duration_seconds: 120,
        },
        a if a >= 5_000 => TierSpec {
            color: "#1DE9B6",
            highlight_duration_seconds: 60,
        },
        a if a >= 1_000 => TierSpec {
            color: "#FFEB3B",
            highlight_duration_seconds: 0,
        },
        _ => TierSpec {
            color: "#E0E0E0",
            highlight_duration_seconds: 0,
        },
    }
}

/// Accepts monetized messages: validates the amount, assigns the visual
/// tier, persists the super chat plus its linked chat message, fans the
/// event out and notifies the stream owner directly. Payment settlement
/// happens elsewhere; `is_paid` stays false here.
pub struct SuperChatProcessor {
    rooms: Arc<RoomRegistry>,
    connections: ConnectionRegistry,
    presence: PresenceTracker,
    persistence: Arc<dyn PersistenceGateway>,
    fanout: Arc<dyn FanoutAdapter>,
    filter: Arc<ContentFilter>,
}

impl SuperChatProcessor {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        connections: ConnectionRegistry,
        presence: PresenceTracker,
        persistence: Arc<dyn PersistenceGateway>,
        fanout: Arc<dyn FanoutAdapter>,
        filter: Arc<ContentFilter>,
    ) -> Self {
        Self {
            rooms,
            connections,
            presence,
            persistence,
            fanout,
            filter,
        }
    }

    pub async fn submit(
        &self,
        stream_id: Uuid,
        identity: &Identity,
        raw_text: &str,
        amount: i64,
        currency: &str,
    ) -> Result<(), ChatError> {
        if amount < 1 {
            return Err(ChatError::Validation(
                "super chat amount must be at least 1".into(),
            ));
        }

        let now = Utc::now();
        let room = self.rooms.get(stream_id).await.ok_or(ChatError::NotFound)?;

        let tier = tier_for_amount(amount);
        let content = self.filter.apply(raw_text);
        let super_chat = SuperChat {
            id: Uuid::new_v4(),
            stream_id,
            user_id: identity.id,
            amount,
            currency: currency.to_string(),
            message: content.clone(),
            color_tier: tier.color.to_string(),
            highlight_duration_seconds: tier.highlight_duration_seconds,
            is_paid: false,
            created_at: now,
        };

        let mut message =
            ChatMessage::new(stream_id, identity.id, content, MessageKind::SuperChat, now);
        message.metadata = Some(serde_json::json!({ "super_chat_id": super_chat.id }));

        let owner_id = {
            let mut room = room.lock().await;
            room.push_message(message.clone());
            room.owner_id
        };

        if let Err(e) = self.persistence.insert_super_chat(&super_chat).await {
            tracing::error!(%stream_id, super_chat_id = %super_chat.id, error = %e, "failed to persist super chat");
        }
        if let Err(e) = self.persistence.insert_message(&message).await {
            tracing::error!(%stream_id, message_id = %message.id, error = %e, "failed to persist super chat message");
        }

        metrics::SUPER_CHATS_TOTAL.inc();
        events::broadcast_event(
            &self.connections,
            self.fanout.as_ref(),
            stream_id,
            &ServerEvent::SuperChat {
                id: super_chat.id,
                user: identity.clone(),
                text: message.content.clone(),
                amount,
                currency: currency.to_string(),
                color: tier.color.to_string(),
                highlight_duration_seconds: tier.highlight_duration_seconds,
            },
        )
        .await;

        if let Some(owner) = self.presence.get(owner_id).await {
            events::send_to(
                &owner.sender,
                stream_id,
                &ServerEvent::SuperChatNotice {
                    id: super_chat.id,
                    user: identity.clone(),
                    amount,
                    currency: currency.to_string(),
                },
            );
        }

        Ok(())
    }
}
