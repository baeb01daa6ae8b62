//! Organization and membership types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{BillingStatus, MemberRole, MemberStatus, OrganizationId, Plan, UserId};

/// Organization record (billing and seat unit)
#[derive(Clone, Debug, Serialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub slug: String,
    pub name: String,
    pub plan: Plan,
    /// `None` means misconfigured, never unlimited.
    pub seat_limit: Option<i32>,
    pub billing_status: BillingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organization member record
#[derive(Clone, Debug, Serialize)]
pub struct OrganizationMember {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub invited_by: Option<UserId>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizationMember {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    pub fn is_active_owner(&self) -> bool {
        self.is_active() && self.role == MemberRole::Owner
    }
}

/// Active member joined with profile display data
#[derive(Clone, Debug, Serialize)]
pub struct MemberWithProfile {
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Seat-consuming rows of one organization, read in a single statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeatCounts {
    /// Active members other than the owner. The owner does not occupy a seat.
    pub active_members: i64,
    /// Pending invites that have not yet passed `expires_at`.
    pub pending_invites: i64,
    /// Active owner rows (1 at steady state).
    pub owners: i64,
}

impl SeatCounts {
    /// Every active membership, owner included.
    pub fn total_active(&self) -> i64 {
        self.active_members + self.owners
    }
}

/// Parameters for creating an organization together with its owner membership
#[derive(Clone, Debug)]
pub struct CreateOrganizationParams {
    pub slug: String,
    pub name: String,
    pub plan: Plan,
    pub seat_limit: Option<i32>,
    pub owner_user_id: UserId,
}
