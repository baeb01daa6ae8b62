//! Invite and membership state transitions.
//!
//! Invites move `pending -> accepted | expired | revoked` and never leave a terminal
//! state. Expiry is applied lazily when an invite is read.

use chrono::{DateTime, Utc};
use tally_storage::{
    Invite, InviteStatus, MembershipTransition, OrganizationMember, Store, StoreError,
};

use crate::MembershipError;

/// Status as the caller should see it at `now`.
pub fn effective_status(invite: &Invite, now: DateTime<Utc>) -> InviteStatus {
    if invite.is_expired_at(now) {
        InviteStatus::Expired
    } else {
        invite.status
    }
}

/// Mark a pending invite expired if its time has passed and return it with the
/// effective status. A failed write is logged and the invite is still reported expired.
pub async fn apply_lazy_expiry(
    store: &dyn Store,
    mut invite: Invite,
    now: DateTime<Utc>,
) -> Invite {
    let status = effective_status(&invite, now);
    if status == invite.status {
        return invite;
    }

    if let Err(e) = store
        .mark_invite_expired(&invite.organization_id, &invite.id)
        .await
    {
        tracing::warn!(
            invite_id = %invite.id.0,
            org_id = %invite.organization_id.0,
            error = %e,
            "Failed to persist invite expiry"
        );
    }
    invite.status = status;
    invite
}

/// Check an invite can be accepted at `now`. Expiry is checked after status, so a
/// stored terminal state is always reported as such.
pub fn ensure_acceptable(invite: &Invite, now: DateTime<Utc>) -> Result<(), MembershipError> {
    match effective_status(invite, now) {
        InviteStatus::Pending => Ok(()),
        InviteStatus::Expired if invite.status == InviteStatus::Pending => {
            Err(MembershipError::InviteExpired)
        }
        status => Err(MembershipError::InviteNotPending(status)),
    }
}

/// Decide how acceptance affects the caller's existing membership row, if any.
pub fn membership_transition(
    existing: Result<OrganizationMember, StoreError>,
) -> Result<MembershipTransition, StoreError> {
    match existing {
        Ok(member) if member.is_active() => Ok(MembershipTransition::AlreadyActive),
        Ok(_) => Ok(MembershipTransition::Reactivate),
        Err(StoreError::NotFound) => Ok(MembershipTransition::Insert),
        Err(e) => Err(e),
    }
}
