use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The user record attached to a connection after the credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub role: String,
    pub verified: bool,
}
