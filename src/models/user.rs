use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::session::Sessions;

/// A stored account. The password hash and sessions never leave the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub sessions: Sessions,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds a new user from an already-hashed password.
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            sessions: Sessions::new(),
            created_at: Utc::now(),
        }
    }
}

/// Fields accepted when creating an account.
#[derive(Debug, Deserialize, Validate)]
pub struct UserInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String, // hashed before it reaches `User`
}
