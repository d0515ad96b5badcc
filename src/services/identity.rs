use crate::error::ChatError;
use crate::middleware::auth;
use crate::models::Identity;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Resolves an opaque session credential to a user record. Every connection
/// passes through this before any room operation is permitted.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, ChatError>;
}

/// JWT-backed verifier: the token's `sub` names the user, the rest of the
/// record comes from the `users` table.
pub struct PgIdentityVerifier {
    db: Pool<Postgres>,
    jwt_secret: String,
}

impl PgIdentityVerifier {
    pub fn new(db: Pool<Postgres>, jwt_secret: String) -> Self {
        Self { db, jwt_secret }
    }
}

#[async_trait]
impl IdentityVerifier for PgIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, ChatError> {
        let claims = auth::verify_token(token, &self.jwt_secret)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ChatError::Authentication)?;

        let row = sqlx::query_as::<_, (String, Option<String>, String, bool)>(
            "SELECT username, avatar_url, role, verified FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| ChatError::Internal(format!("user lookup: {e}")))?;

        let (name, avatar, role, verified) = row.ok_or(ChatError::Authentication)?;
        Ok(Identity {
            id: user_id,
            name,
            avatar,
            role,
            verified,
        })
    }
}
