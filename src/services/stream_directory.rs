use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct LiveStream {
    pub id: Uuid,
    pub owner_id: Uuid,
}

/// Lookup for the platform's stream catalog. A room may only be joined while
/// its stream is live.
#[async_trait]
pub trait StreamDirectory: Send + Sync {
    async fn live_stream(&self, stream_id: Uuid) -> Result<Option<LiveStream>, AppError>;
}

pub struct PgStreamDirectory {
    db: Pool<Postgres>,
}

impl PgStreamDirectory {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StreamDirectory for PgStreamDirectory {
    async fn live_stream(&self, stream_id: Uuid) -> Result<Option<LiveStream>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT id, creator_id FROM streams WHERE id = $1 AND status = 'live'",
        )
        .bind(stream_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(id, owner_id)| LiveStream { id, owner_id }))
    }
}
