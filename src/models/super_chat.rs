use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monetized chat message. Immutable once created except `is_paid`, which
/// a downstream settlement pipeline flips after payment clears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperChat {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub message: String,
    pub color_tier: String,
    pub highlight_duration_seconds: u32,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}
