//! Role and status enums for organization membership, invites and billing.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role within an organization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,        // Invites, removes and re-roles members; one per organization
    Collaborator, // Read/write access to cost data
    ReadOnly,     // Dashboards and exports only
}

/// Error type for parsing MemberRole from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMemberRoleError(pub String);

impl std::fmt::Display for ParseMemberRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid member role: {}", self.0)
    }
}

impl std::error::Error for ParseMemberRoleError {}

impl FromStr for MemberRole {
    type Err = ParseMemberRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(MemberRole::Owner),
            "collaborator" => Ok(MemberRole::Collaborator),
            "read_only" => Ok(MemberRole::ReadOnly),
            _ => Err(ParseMemberRoleError(s.to_string())),
        }
    }
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Collaborator => "collaborator",
            MemberRole::ReadOnly => "read_only",
        }
    }

    /// Whether this role can be granted through an invite or a role change.
    /// Ownership is only ever assigned by organization creation.
    pub fn is_assignable(&self) -> bool {
        !matches!(self, MemberRole::Owner)
    }
}

/// Membership status. Removal is a soft delete to `Inactive`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Inactive,
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MemberStatus::Active),
            "inactive" => Ok(MemberStatus::Inactive),
            _ => Err(format!("invalid member status: {}", s)),
        }
    }
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
        }
    }
}

/// Invite lifecycle status. Everything but `Pending` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl FromStr for InviteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InviteStatus::Pending),
            "accepted" => Ok(InviteStatus::Accepted),
            "expired" => Ok(InviteStatus::Expired),
            "revoked" => Ok(InviteStatus::Revoked),
            _ => Err(format!("invalid invite status: {}", s)),
        }
    }
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Expired => "expired",
            InviteStatus::Revoked => "revoked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InviteStatus::Pending)
    }
}

impl std::fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing plan tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Pro,
    Enterprise,
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            "enterprise" => Ok(Plan::Enterprise),
            _ => Err(format!("invalid plan: {}", s)),
        }
    }
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }

    /// Seat limit applied at onboarding when none is given explicitly.
    /// Every plan has a finite limit; there is no "unlimited" seat count.
    pub fn default_seat_limit(&self) -> i32 {
        match self {
            Plan::Free => 3,
            Plan::Pro => 25,
            Plan::Enterprise => 250,
        }
    }
}

/// Billing status of the organization's subscription
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
}

impl FromStr for BillingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BillingStatus::Active),
            "trialing" => Ok(BillingStatus::Trialing),
            "past_due" => Ok(BillingStatus::PastDue),
            "canceled" => Ok(BillingStatus::Canceled),
            _ => Err(format!("invalid billing status: {}", s)),
        }
    }
}

impl BillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::Active => "active",
            BillingStatus::Trialing => "trialing",
            BillingStatus::PastDue => "past_due",
            BillingStatus::Canceled => "canceled",
        }
    }
}
