//! Member operations: removal, role changes and the members page view.

use chrono::Utc;
use tally_storage::{MemberRole, Organization, OrganizationMember, StoreError, UserId};

use super::{ensure_owner, MembersData, MembershipService, OrganizationSummary, Pagination};
use crate::identity::RequestContext;
use crate::seats::SeatUsage;
use crate::validation::{require_org_slug, require_uuid};
use crate::MembershipError;

/// Which mutation a member operation performs, for messages and logs.
#[derive(Clone, Copy)]
enum MemberAction {
    Remove,
    ChangeRole,
}

impl MemberAction {
    fn verb(self) -> &'static str {
        match self {
            MemberAction::Remove => "remove members",
            MemberAction::ChangeRole => "change member roles",
        }
    }

    fn self_message(self) -> &'static str {
        match self {
            MemberAction::Remove => "You cannot remove yourself from the organization",
            MemberAction::ChangeRole => "You cannot change your own role",
        }
    }

    fn owner_message(self) -> &'static str {
        match self {
            MemberAction::Remove => "The organization owner cannot be removed",
            MemberAction::ChangeRole => "The organization owner's role cannot be changed",
        }
    }
}

impl MembershipService {
    /// Soft-delete a member (status becomes inactive). Owner only.
    pub async fn remove_member(
        &self,
        ctx: &RequestContext,
        org_slug: &str,
        member_user_id: &str,
    ) -> Result<(), MembershipError> {
        require_org_slug(org_slug)?;
        let target_id = UserId(require_uuid(member_user_id, "member ID")?);

        let (org, target) = self
            .authorize_member_change(ctx, org_slug, &target_id, MemberAction::Remove)
            .await?;

        self.store
            .deactivate_member(&org.id, &target.user_id)
            .await
            .map_err(|e| MembershipError::from_store(e, "Member not found"))?;

        tracing::info!(
            org_id = %org.id.0,
            user_id = %target.user_id.0,
            "Member removed"
        );
        Ok(())
    }

    /// Change a member's role. Status is left untouched. Owner only.
    pub async fn update_member_role(
        &self,
        ctx: &RequestContext,
        org_slug: &str,
        member_user_id: &str,
        role: MemberRole,
    ) -> Result<(), MembershipError> {
        require_org_slug(org_slug)?;
        let target_id = UserId(require_uuid(member_user_id, "member ID")?);
        if !role.is_assignable() {
            return Err(MembershipError::invalid(
                "Role must be collaborator or read_only",
            ));
        }

        let (org, target) = self
            .authorize_member_change(ctx, org_slug, &target_id, MemberAction::ChangeRole)
            .await?;

        self.store
            .update_member_role(&org.id, &target.user_id, role)
            .await
            .map_err(|e| MembershipError::from_store(e, "Member not found"))?;

        tracing::info!(
            org_id = %org.id.0,
            user_id = %target.user_id.0,
            from = target.role.as_str(),
            to = role.as_str(),
            "Member role changed"
        );
        Ok(())
    }

    /// Shared checks for mutating another member. Order matters: self-targeting and
    /// owner targets are reported before the caller's own role, so those answers are
    /// the same for every caller.
    async fn authorize_member_change(
        &self,
        ctx: &RequestContext,
        org_slug: &str,
        target_id: &UserId,
        action: MemberAction,
    ) -> Result<(Organization, OrganizationMember), MembershipError> {
        let caller = self.authenticate(ctx).await?;
        let org = self.load_org(org_slug).await?;
        let caller_member = self.require_member(&org, &caller).await?;

        if *target_id == caller.user_id {
            return Err(MembershipError::SelfModification(
                action.self_message().to_string(),
            ));
        }

        // Always filtered by this organization, never by user id alone.
        let target = match self.store.get_member(&org.id, target_id).await {
            Ok(member) if member.is_active() => member,
            Ok(_) | Err(StoreError::NotFound) => {
                return Err(MembershipError::not_found("Member not found"));
            }
            Err(e) => return Err(e.into()),
        };

        if target.role == MemberRole::Owner {
            return Err(MembershipError::conflict(action.owner_message()));
        }

        ensure_owner(&org, &caller_member, action.verb())?;
        Ok((org, target))
    }

    /// Members page view. Any active member may read it.
    pub async fn fetch_members_data(
        &self,
        ctx: &RequestContext,
        org_slug: &str,
    ) -> Result<MembersData, MembershipError> {
        require_org_slug(org_slug)?;

        let caller = self.authenticate(ctx).await?;
        let org = self.load_org(org_slug).await?;
        let me = self.require_member(&org, &caller).await?;

        self.expire_stale(&org.id).await;

        let members = self
            .store
            .list_active_members(&org.id, self.config.members_page_size)
            .await?;
        let pending_invites = self
            .store
            .list_pending_invites(&org.id, Utc::now(), self.config.invites_page_size)
            .await?;
        let counts = self.store.seat_counts(&org.id, Utc::now()).await?;

        let seats = match SeatUsage::new(counts, org.seat_limit) {
            Ok(usage) => Some(usage),
            Err(_) => {
                tracing::warn!(org_id = %org.id.0, "Organization has no seat limit configured");
                None
            }
        };

        let total_members = counts.total_active();
        let pagination = Pagination {
            total_members,
            members_returned: members.len(),
            has_more_members: total_members > members.len() as i64,
            pending_invites_returned: pending_invites.len(),
        };

        Ok(MembersData {
            organization: OrganizationSummary::from(&org),
            current_user_role: me.role,
            members,
            pending_invites,
            seats,
            pagination,
        })
    }
}
