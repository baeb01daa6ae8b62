//! The Membership & Invite Manager.
//!
//! Every operation runs the same pipeline: validate input, resolve the caller,
//! authorize against the organization, then read/write through the tenant-scoped
//! [`Store`]. Operations return `Result<_, MembershipError>`; wrap them in
//! [`ActionResponse`](crate::ActionResponse) at the transport boundary.

mod invites;
mod members;
mod organizations;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_storage::{
    BillingStatus, Invite, InviteId, InviteStatus, MemberRole, MemberWithProfile, Organization,
    OrganizationId, OrganizationMember, Plan, Store, StoreError, UserId,
};

use crate::config::MembershipConfig;
use crate::email::{create_mailer, EmailError, InviteMailer};
use crate::identity::{Identity, IdentityResolver, RequestContext, SessionIdentityResolver};
use crate::rate_limit::{InviteRateLimiter, MemoryRateLimiter};
use crate::seats::SeatUsage;
use crate::MembershipError;

pub use organizations::CreateOrganization;

/// Organization fields safe to show to any member.
#[derive(Clone, Debug, Serialize)]
pub struct OrganizationSummary {
    pub id: OrganizationId,
    pub slug: String,
    pub name: String,
    pub plan: Plan,
    pub billing_status: BillingStatus,
    pub seat_limit: Option<i32>,
}

impl From<&Organization> for OrganizationSummary {
    fn from(org: &Organization) -> Self {
        Self {
            id: org.id.clone(),
            slug: org.slug.clone(),
            name: org.name.clone(),
            plan: org.plan,
            billing_status: org.billing_status,
            seat_limit: org.seat_limit,
        }
    }
}

/// Result of a successful invite. The link carries the only copy of the token.
#[derive(Clone, Debug, Serialize)]
pub struct InviteCreated {
    pub invite_id: InviteId,
    pub email: String,
    pub role: MemberRole,
    pub expires_at: DateTime<Utc>,
    pub invite_link: String,
    pub email_sent: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct InviteAccepted {
    pub organization_slug: String,
    pub organization_name: String,
    pub role: MemberRole,
    /// The caller was already an active member; only the invite was consumed.
    pub already_member: bool,
}

/// Public view of an invite for the landing page.
#[derive(Clone, Debug, Serialize)]
pub struct InviteInfo {
    pub organization_name: String,
    pub organization_slug: String,
    pub email: String,
    pub role: MemberRole,
    pub status: InviteStatus,
    pub expires_at: DateTime<Utc>,
    pub inviter_name: String,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Pagination {
    pub total_members: i64,
    pub members_returned: usize,
    pub has_more_members: bool,
    pub pending_invites_returned: usize,
}

/// Aggregate view backing the members page.
#[derive(Clone, Debug, Serialize)]
pub struct MembersData {
    pub organization: OrganizationSummary,
    pub current_user_role: MemberRole,
    pub members: Vec<MemberWithProfile>,
    pub pending_invites: Vec<Invite>,
    /// `None` when the organization has no seat limit configured.
    pub seats: Option<SeatUsage>,
    pub pagination: Pagination,
}

pub struct MembershipService {
    store: Arc<dyn Store>,
    identity: Arc<dyn IdentityResolver>,
    rate_limiter: Arc<dyn InviteRateLimiter>,
    mailer: Arc<dyn InviteMailer>,
    config: MembershipConfig,
}

impl MembershipService {
    pub fn new(
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityResolver>,
        rate_limiter: Arc<dyn InviteRateLimiter>,
        mailer: Arc<dyn InviteMailer>,
        config: MembershipConfig,
    ) -> Self {
        Self {
            store,
            identity,
            rate_limiter,
            mailer,
            config,
        }
    }

    /// Wire the default collaborators: session lookup, in-memory rate limiting and the
    /// configured mailer.
    pub fn from_config(
        store: Arc<dyn Store>,
        config: MembershipConfig,
    ) -> Result<Self, EmailError> {
        let mailer: Arc<dyn InviteMailer> = Arc::from(create_mailer(config.email.as_ref())?);
        let rate_limiter = Arc::new(MemoryRateLimiter::new(
            config.invite_rate_limit,
            config.invite_rate_window,
        ));
        let identity = Arc::new(SessionIdentityResolver::new(store.clone()));
        Ok(Self::new(store, identity, rate_limiter, mailer, config))
    }

    pub fn config(&self) -> &MembershipConfig {
        &self.config
    }

    // ───────────────────────────────────── Helpers ─────────────────────────────────────

    async fn authenticate(&self, ctx: &RequestContext) -> Result<Identity, MembershipError> {
        self.identity
            .resolve(ctx)
            .await?
            .ok_or(MembershipError::Unauthenticated)
    }

    async fn load_org(&self, slug: &str) -> Result<Organization, MembershipError> {
        self.store
            .get_organization_by_slug(slug)
            .await
            .map_err(|e| MembershipError::from_store(e, "Organization not found"))
    }

    /// The caller's active membership. Non-members get the same answer as for an
    /// organization that does not exist.
    async fn require_member(
        &self,
        org: &Organization,
        caller: &Identity,
    ) -> Result<OrganizationMember, MembershipError> {
        match self.store.get_member(&org.id, &caller.user_id).await {
            Ok(member) if member.is_active() => Ok(member),
            Ok(_) | Err(StoreError::NotFound) => {
                tracing::warn!(
                    org_id = %org.id.0,
                    user_id = %caller.user_id.0,
                    "Denied: caller is not an active member"
                );
                Err(MembershipError::not_found("Organization not found"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn require_owner(
        &self,
        org: &Organization,
        caller: &Identity,
        action: &str,
    ) -> Result<OrganizationMember, MembershipError> {
        let member = self.require_member(org, caller).await?;
        ensure_owner(org, &member, action)?;
        Ok(member)
    }

    async fn seat_usage(&self, org: &Organization) -> Result<SeatUsage, MembershipError> {
        let counts = self.store.seat_counts(&org.id, Utc::now()).await?;
        SeatUsage::new(counts, org.seat_limit)
    }

    /// Best-effort bulk expiry so stale pending rows don't block new invites.
    async fn expire_stale(&self, org_id: &OrganizationId) {
        if let Err(e) = self.store.expire_stale_invites(org_id, Utc::now()).await {
            tracing::warn!(org_id = %org_id.0, error = %e, "Failed to expire stale invites");
        }
    }

    async fn display_name(&self, user_id: &UserId) -> String {
        match self.store.get_profile(user_id).await {
            Ok(profile) => profile.display_name().to_string(),
            Err(_) => "A team member".to_string(),
        }
    }
}

fn ensure_owner(
    org: &Organization,
    member: &OrganizationMember,
    action: &str,
) -> Result<(), MembershipError> {
    if member.is_active_owner() {
        return Ok(());
    }
    tracing::warn!(
        org_id = %org.id.0,
        user_id = %member.user_id.0,
        action,
        "Denied: owner role required"
    );
    Err(MembershipError::unauthorized(format!(
        "Only the organization owner can {}",
        action
    )))
}
