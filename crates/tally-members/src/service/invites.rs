//! Invite operations: create, accept, cancel and the public landing lookup.

use chrono::Utc;
use tally_storage::{
    AcceptInviteParams, CreateInviteParams, InviteId, InviteStatus, MemberRole,
    MembershipTransition, StoreError,
};

use super::{InviteAccepted, InviteCreated, InviteInfo, MembershipService};
use crate::email::InviteEmail;
use crate::identity::RequestContext;
use crate::lifecycle::{apply_lazy_expiry, ensure_acceptable, membership_transition};
use crate::token::{generate_invite_token, hash_token};
use crate::validation::{require_email, require_invite_token, require_org_slug, require_uuid};
use crate::MembershipError;

impl MembershipService {
    /// Invite `email` to the organization as `role`. Owner only.
    ///
    /// The invite reserves a seat until it is accepted, revoked or expires. Email
    /// delivery is attempted but its failure does not fail the invite; the returned
    /// link is the source of truth.
    pub async fn invite_member(
        &self,
        ctx: &RequestContext,
        org_slug: &str,
        email: &str,
        role: MemberRole,
    ) -> Result<InviteCreated, MembershipError> {
        require_org_slug(org_slug)?;
        let email = require_email(email)?;
        if !role.is_assignable() {
            return Err(MembershipError::invalid(
                "Invites can only grant the collaborator or read_only role",
            ));
        }

        let caller = self.authenticate(ctx).await?;
        let org = self.load_org(org_slug).await?;
        self.require_owner(&org, &caller, "invite members").await?;

        if !self.rate_limiter.try_acquire(&caller.user_id).await {
            tracing::warn!(
                org_id = %org.id.0,
                user_id = %caller.user_id.0,
                "Invite rate limit hit"
            );
            return Err(MembershipError::RateLimited);
        }

        // Already an active member under this email?
        match self.store.get_profile_by_email(&email).await {
            Ok(profile) => match self.store.get_member(&org.id, &profile.user_id).await {
                Ok(member) if member.is_active() => {
                    return Err(MembershipError::conflict(
                        "This person is already a member of the organization",
                    ));
                }
                Ok(_) | Err(StoreError::NotFound) => {}
                Err(e) => return Err(e.into()),
            },
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        self.expire_stale(&org.id).await;
        match self.store.find_pending_invite(&org.id, &email).await {
            Ok(_) => {
                return Err(MembershipError::conflict(
                    "An invite is already pending for this email",
                ));
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        self.seat_usage(&org).await?.check_invite()?;

        let token = generate_invite_token();
        let expires_at = Utc::now() + self.config.invite_ttl;
        let invite = self
            .store
            .create_invite(
                &org.id,
                &CreateInviteParams {
                    email: email.clone(),
                    role,
                    token_hash: hash_token(&token),
                    invited_by: caller.user_id.clone(),
                    expires_at,
                },
            )
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => {
                    MembershipError::conflict("An invite is already pending for this email")
                }
                e => e.into(),
            })?;

        tracing::info!(
            org_id = %org.id.0,
            invite_id = %invite.id.0,
            invited_by = %caller.user_id.0,
            role = role.as_str(),
            "Invite created"
        );

        let invite_link = self.config.invite_link(&token);
        let mail = InviteEmail {
            to: email.clone(),
            inviter_name: self.display_name(&caller.user_id).await,
            org_name: org.name.clone(),
            role,
            invite_link: invite_link.clone(),
        };
        let email_sent = match self.mailer.send_invite(&mail).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    org_id = %org.id.0,
                    invite_id = %invite.id.0,
                    error = %e,
                    "Failed to send invite email"
                );
                false
            }
        };

        Ok(InviteCreated {
            invite_id: invite.id,
            email,
            role,
            expires_at: invite.expires_at,
            invite_link,
            email_sent,
        })
    }

    /// Accept an invite as the signed-in user.
    ///
    /// The caller's email must match the invite. Seats are re-checked now, since they
    /// may have filled after the invite went out.
    pub async fn accept_invite(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> Result<InviteAccepted, MembershipError> {
        require_invite_token(token)?;
        let caller = self.authenticate(ctx).await?;

        let invite = self
            .store
            .get_invite_by_token_hash(&hash_token(token))
            .await
            .map_err(|e| MembershipError::from_store(e, "Invite not found"))?;

        let now = Utc::now();
        if let Err(e) = ensure_acceptable(&invite, now) {
            if matches!(e, MembershipError::InviteExpired) {
                apply_lazy_expiry(self.store.as_ref(), invite, now).await;
            }
            return Err(e);
        }

        if caller.email.to_lowercase() != invite.email.to_lowercase() {
            tracing::warn!(
                invite_id = %invite.id.0,
                user_id = %caller.user_id.0,
                "Denied: invite email does not match caller"
            );
            return Err(MembershipError::unauthorized(format!(
                "This invite was sent to {}. Sign in with that email address to accept it.",
                invite.email
            )));
        }

        let org = self
            .store
            .get_organization(&invite.organization_id)
            .await
            .map_err(|e| MembershipError::from_store(e, "Organization not found"))?;

        let transition =
            membership_transition(self.store.get_member(&org.id, &caller.user_id).await)?;

        if transition != MembershipTransition::AlreadyActive {
            // The invite is still pending, so its own seat is part of the count.
            self.seat_usage(&org).await?.check_accept(true)?;
        }

        let params = AcceptInviteParams {
            invite_id: invite.id.clone(),
            user_id: caller.user_id.clone(),
            role: invite.role,
            invited_by: invite.invited_by.clone(),
            accepted_at: now,
            transition,
        };
        let member = match self.store.accept_invite(&org.id, &params).await {
            Ok(member) => member,
            Err(StoreError::Conflict) => {
                // Lost a race with another accept or a revoke; report where it ended up.
                let current = self.store.get_invite(&org.id, &invite.id).await?;
                return Err(match current.status {
                    InviteStatus::Pending => MembershipError::conflict(
                        "Your membership changed while accepting the invite. Please try again.",
                    ),
                    status => MembershipError::InviteNotPending(status),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            org_id = %org.id.0,
            invite_id = %invite.id.0,
            user_id = %caller.user_id.0,
            transition = ?transition,
            "Invite accepted"
        );

        Ok(InviteAccepted {
            organization_slug: org.slug,
            organization_name: org.name,
            role: member.role,
            already_member: transition == MembershipTransition::AlreadyActive,
        })
    }

    /// Revoke a pending invite. Owner only. Revoking a terminal invite is a no-op.
    pub async fn cancel_invite(
        &self,
        ctx: &RequestContext,
        org_slug: &str,
        invite_id: &str,
    ) -> Result<(), MembershipError> {
        require_org_slug(org_slug)?;
        let invite_id = InviteId(require_uuid(invite_id, "invite ID")?);

        let caller = self.authenticate(ctx).await?;
        let org = self.load_org(org_slug).await?;
        self.require_owner(&org, &caller, "cancel invites").await?;

        let revoked = self
            .store
            .revoke_invite(&org.id, &invite_id)
            .await
            .map_err(|e| MembershipError::from_store(e, "Invite not found"))?;

        if revoked {
            tracing::info!(org_id = %org.id.0, invite_id = %invite_id.0, "Invite revoked");
        } else {
            tracing::debug!(
                org_id = %org.id.0,
                invite_id = %invite_id.0,
                "Invite already terminal; nothing to revoke"
            );
        }
        Ok(())
    }

    /// Look up an invite by token for the landing page. No sign-in required; the
    /// token is the credential.
    pub async fn get_invite_info(&self, token: &str) -> Result<InviteInfo, MembershipError> {
        require_invite_token(token)?;

        let invite = self
            .store
            .get_invite_by_token_hash(&hash_token(token))
            .await
            .map_err(|e| MembershipError::from_store(e, "Invite not found"))?;
        let invite = apply_lazy_expiry(self.store.as_ref(), invite, Utc::now()).await;

        let org = self
            .store
            .get_organization(&invite.organization_id)
            .await
            .map_err(|e| MembershipError::from_store(e, "Invite not found"))?;

        Ok(InviteInfo {
            organization_name: org.name,
            organization_slug: org.slug,
            inviter_name: self.display_name(&invite.invited_by).await,
            email: invite.email,
            role: invite.role,
            status: invite.status,
            expires_at: invite.expires_at,
        })
    }
}
