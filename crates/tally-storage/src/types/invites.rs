//! Organization invite types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{InviteId, InviteStatus, MemberRole, OrganizationId, UserId};

/// Invite record. The bearer token itself is never stored, only its SHA-256 hash.
#[derive(Clone, Debug, Serialize)]
pub struct Invite {
    pub id: InviteId,
    pub organization_id: OrganizationId,
    pub email: String,
    pub role: MemberRole,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub status: InviteStatus,
    pub invited_by: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_by: Option<UserId>,
}

impl Invite {
    pub fn is_pending(&self) -> bool {
        self.status == InviteStatus::Pending
    }

    /// A pending invite whose expiry has passed. Terminal invites never report expired here.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && now > self.expires_at
    }
}

/// Parameters for creating an invite
#[derive(Clone, Debug)]
pub struct CreateInviteParams {
    /// Already normalized (trimmed, lowercase)
    pub email: String,
    pub role: MemberRole,
    pub token_hash: String,
    pub invited_by: UserId,
    pub expires_at: DateTime<Utc>,
}

/// How an accepted invite turns into an active membership
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipTransition {
    /// No membership row yet
    Insert,
    /// Reactivate an inactive row with the invite's role
    Reactivate,
    /// Already active; only the invite is consumed
    AlreadyActive,
}

/// Parameters for consuming an invite
#[derive(Clone, Debug)]
pub struct AcceptInviteParams {
    pub invite_id: InviteId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub invited_by: UserId,
    pub accepted_at: DateTime<Utc>,
    pub transition: MembershipTransition,
}
