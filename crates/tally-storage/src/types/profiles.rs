//! Profile and session types supplied by the identity provider.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::UserId;

/// Profile record (display data for a user)
#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    pub user_id: UserId,
    /// Stored lowercase
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Name shown in invite emails and member lists.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

/// Parameters for creating a profile
#[derive(Clone, Debug)]
pub struct CreateProfileParams {
    pub user_id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Authenticated session record
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a session
#[derive(Clone, Debug)]
pub struct CreateSessionParams {
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
