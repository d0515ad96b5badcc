use crate::error::AppError;
use crate::models::{ChatMessage, MessageKind, SuperChat};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

/// Durable storage sink for chat records. The gateway never owns room state;
/// writes issued after a successful broadcast are logged on failure, not
/// rolled back.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), AppError>;

    async fn mark_message_deleted(
        &self,
        message_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn insert_super_chat(&self, super_chat: &SuperChat) -> Result<(), AppError>;

    /// Most recent non-deleted messages for a stream, oldest first.
    async fn recent_messages(
        &self,
        stream_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, AppError>;

    async fn record_viewer_count(
        &self,
        stream_id: Uuid,
        viewer_count: u32,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

pub struct PgPersistenceGateway {
    db: Pool<Postgres>,
}

impl PgPersistenceGateway {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PersistenceGateway for PgPersistenceGateway {
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO chat_messages (id, stream_id, user_id, content, kind, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(message.id)
        .bind(message.stream_id)
        .bind(message.user_id)
        .bind(&message.content)
        .bind(message.kind.as_str())
        .bind(&message.metadata)
        .bind(message.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn mark_message_deleted(
        &self,
        message_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE chat_messages SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
            .bind(message_id)
            .bind(deleted_at)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn insert_super_chat(&self, super_chat: &SuperChat) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO super_chats \
             (id, stream_id, user_id, amount, currency, message, color_tier, highlight_duration_seconds, is_paid, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(super_chat.id)
        .bind(super_chat.stream_id)
        .bind(super_chat.user_id)
        .bind(super_chat.amount)
        .bind(&super_chat.currency)
        .bind(&super_chat.message)
        .bind(&super_chat.color_tier)
        .bind(super_chat.highlight_duration_seconds as i32)
        .bind(super_chat.is_paid)
        .bind(super_chat.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        stream_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let rows = sqlx::query(
            "SELECT id, stream_id, user_id, content, kind, metadata, created_at, deleted_at \
             FROM chat_messages \
             WHERE stream_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC \
             LIMIT $2",
        )
        .bind(stream_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.try_get("kind")?;
            messages.push(ChatMessage {
                id: row.try_get("id")?,
                stream_id: row.try_get("stream_id")?,
                user_id: row.try_get("user_id")?,
                content: row.try_get("content")?,
                kind: MessageKind::parse(&kind),
                metadata: row.try_get("metadata")?,
                created_at: row.try_get("created_at")?,
                deleted_at: row.try_get("deleted_at")?,
            });
        }
        messages.reverse();
        Ok(messages)
    }

    async fn record_viewer_count(
        &self,
        stream_id: Uuid,
        viewer_count: u32,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO stream_viewer_snapshots (stream_id, viewer_count, recorded_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(stream_id)
        .bind(viewer_count as i32)
        .bind(recorded_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
