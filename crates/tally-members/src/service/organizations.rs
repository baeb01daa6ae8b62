//! Organization onboarding.

use tally_storage::{CreateOrganizationParams, Organization, Plan, StoreError};

use super::MembershipService;
use crate::identity::RequestContext;
use crate::validation::require_org_slug;
use crate::MembershipError;

const MAX_ORG_NAME_LEN: usize = 100;

#[derive(Clone, Debug)]
pub struct CreateOrganization {
    pub slug: String,
    pub name: String,
    pub plan: Plan,
    /// Defaults to the plan's seat limit.
    pub seat_limit: Option<i32>,
}

impl MembershipService {
    /// Create an organization with the caller as its single owner.
    pub async fn create_organization(
        &self,
        ctx: &RequestContext,
        req: CreateOrganization,
    ) -> Result<Organization, MembershipError> {
        require_org_slug(&req.slug)?;
        let name = req.name.trim();
        if name.is_empty() || name.chars().count() > MAX_ORG_NAME_LEN {
            return Err(MembershipError::invalid(
                "Organization name must be between 1 and 100 characters",
            ));
        }
        let seat_limit = req.seat_limit.unwrap_or(req.plan.default_seat_limit());
        if seat_limit < 1 {
            return Err(MembershipError::invalid("Seat limit must be at least 1"));
        }

        let caller = self.authenticate(ctx).await?;

        let org = self
            .store
            .create_organization(&CreateOrganizationParams {
                slug: req.slug,
                name: name.to_string(),
                plan: req.plan,
                seat_limit: Some(seat_limit),
                owner_user_id: caller.user_id.clone(),
            })
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => {
                    MembershipError::conflict("An organization with this slug already exists")
                }
                e => e.into(),
            })?;

        tracing::info!(
            org_id = %org.id.0,
            slug = %org.slug,
            owner = %caller.user_id.0,
            plan = org.plan.as_str(),
            seat_limit,
            "Organization created"
        );
        Ok(org)
    }
}
