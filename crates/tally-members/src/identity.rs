//! Resolves the calling principal of a request.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tally_storage::{Store, StoreError, UserId};

use crate::token::hash_token;

/// The authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    /// Normalized (lowercase)
    pub email: String,
}

/// Per-request data handed in by the transport layer.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// Bearer session token, if the request carried one.
    pub session_token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_session(token: impl Into<String>) -> Self {
        Self {
            session_token: Some(token.into()),
        }
    }
}

/// `Ok(None)` means there is no signed-in user; it is never treated as a guest.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, ctx: &RequestContext) -> Result<Option<Identity>, StoreError>;
}

/// Looks the session token up in the identity provider's session table.
pub struct SessionIdentityResolver {
    store: Arc<dyn Store>,
}

impl SessionIdentityResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityResolver for SessionIdentityResolver {
    async fn resolve(&self, ctx: &RequestContext) -> Result<Option<Identity>, StoreError> {
        let Some(token) = ctx.session_token.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let session = match self.store.get_session(&hash_token(token)).await {
            Ok(session) => session,
            Err(StoreError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        if session.expires_at <= Utc::now() {
            tracing::debug!(user_id = %session.user_id.0, "Ignoring expired session");
            return Ok(None);
        }

        let profile = match self.store.get_profile(&session.user_id).await {
            Ok(profile) => profile,
            Err(StoreError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(Some(Identity {
            user_id: profile.user_id,
            email: profile.email.to_lowercase(),
        }))
    }
}
