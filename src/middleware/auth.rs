use crate::error::ChatError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject - typically the user_id
    pub exp: i64,    // expiration time (unix timestamp)
}

/// Validate JWT signature and extract claims (HS256).
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ChatError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .map_err(|_| ChatError::Authentication)
}
