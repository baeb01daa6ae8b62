//! The Store trait that backends implement.

use chrono::{DateTime, Utc};

use crate::types::*;
use crate::StoreError;

/// The storage trait `tally-members` depends on.
///
/// The store is a trusted service boundary: it does no authorization of its own, so
/// every method that touches membership or invite rows is **scoped by organization**.
/// The only unscoped lookups are by bearer credential (session or invite token hash)
/// and the global profile/organization directories.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Profiles ───────────────────────────────────────

    /// Create a profile. Email must already be normalized.
    async fn create_profile(&self, params: &CreateProfileParams) -> Result<Profile, StoreError>;

    /// Get profile by user ID.
    async fn get_profile(&self, user_id: &UserId) -> Result<Profile, StoreError>;

    /// Get profile by (normalized) email.
    async fn get_profile_by_email(&self, email: &str) -> Result<Profile, StoreError>;

    // ───────────────────────────────────── Sessions ───────────────────────────────────────

    /// Record a session token hash for a user.
    async fn create_session(&self, params: &CreateSessionParams) -> Result<(), StoreError>;

    /// Look up a session by token hash (expired sessions are still returned).
    async fn get_session(&self, token_hash: &str) -> Result<Session, StoreError>;

    // ─────────────────────────────────── Organizations ────────────────────────────────────

    /// Create an organization and its owner membership atomically.
    async fn create_organization(
        &self,
        params: &CreateOrganizationParams,
    ) -> Result<Organization, StoreError>;

    /// Get organization by ID.
    async fn get_organization(&self, org_id: &OrganizationId) -> Result<Organization, StoreError>;

    /// Get organization by slug.
    async fn get_organization_by_slug(&self, slug: &str) -> Result<Organization, StoreError>;

    /// Update an organization's seat limit (`None` clears it).
    async fn set_seat_limit(
        &self,
        org_id: &OrganizationId,
        seat_limit: Option<i32>,
    ) -> Result<(), StoreError>;

    // ──────────────────────────────── Organization Members ────────────────────────────────

    /// Get a user's membership row (active or inactive) in an organization.
    async fn get_member(
        &self,
        org_id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<OrganizationMember, StoreError>;

    /// List active members joined with profiles, oldest first, capped at `limit`.
    async fn list_active_members(
        &self,
        org_id: &OrganizationId,
        limit: i64,
    ) -> Result<Vec<MemberWithProfile>, StoreError>;

    /// Exact count of seat-holding members, unexpired pending invites and owners.
    async fn seat_counts(
        &self,
        org_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<SeatCounts, StoreError>;

    /// Change an active member's role. Status is left untouched.
    async fn update_member_role(
        &self,
        org_id: &OrganizationId,
        user_id: &UserId,
        role: MemberRole,
    ) -> Result<(), StoreError>;

    /// Soft-delete a member (status becomes inactive).
    async fn deactivate_member(
        &self,
        org_id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<(), StoreError>;

    // ──────────────────────────────── Organization Invites ────────────────────────────────

    /// Create a pending invite. Fails with `AlreadyExists` if one is already pending for
    /// the email, or `SeatLimit` if the seat guard rejects it.
    async fn create_invite(
        &self,
        org_id: &OrganizationId,
        params: &CreateInviteParams,
    ) -> Result<Invite, StoreError>;

    /// Get an invite by ID within an organization.
    async fn get_invite(
        &self,
        org_id: &OrganizationId,
        invite_id: &InviteId,
    ) -> Result<Invite, StoreError>;

    /// Get an invite by token hash (the token is the bearer credential).
    async fn get_invite_by_token_hash(&self, token_hash: &str) -> Result<Invite, StoreError>;

    /// Get the pending invite for an email, if any.
    async fn find_pending_invite(
        &self,
        org_id: &OrganizationId,
        email: &str,
    ) -> Result<Invite, StoreError>;

    /// List unexpired pending invites, newest first, capped at `limit`.
    async fn list_pending_invites(
        &self,
        org_id: &OrganizationId,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Invite>, StoreError>;

    /// Move one pending invite to expired. No-op if it is no longer pending.
    async fn mark_invite_expired(
        &self,
        org_id: &OrganizationId,
        invite_id: &InviteId,
    ) -> Result<(), StoreError>;

    /// Move every pending invite past `now` to expired; returns how many changed.
    async fn expire_stale_invites(
        &self,
        org_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Revoke a pending invite. Returns `false` if it was already terminal.
    async fn revoke_invite(
        &self,
        org_id: &OrganizationId,
        invite_id: &InviteId,
    ) -> Result<bool, StoreError>;

    /// Consume a pending invite and apply the membership transition in one transaction.
    /// Fails with `Conflict` if the invite was consumed concurrently.
    async fn accept_invite(
        &self,
        org_id: &OrganizationId,
        params: &AcceptInviteParams,
    ) -> Result<OrganizationMember, StoreError>;
}
