//! Organization membership and invite management for tally.
//!
//! [`MembershipService`] is the entry point. It keeps the seat invariant
//! (`active members + pending invites <= seat_limit`), protects the organization owner,
//! and drives invites through `pending -> accepted | expired | revoked`. Storage is
//! reached only through the tenant-scoped [`tally_storage::Store`] trait.

pub mod config;
pub mod email;
mod error;
pub mod identity;
pub mod lifecycle;
pub mod rate_limit;
mod response;
pub mod seats;
mod service;
pub mod token;
pub mod validation;

#[cfg(test)]
mod tests;

pub use config::{ConfigError, EmailConfig, EmailProviderConfig, MembershipConfig};
pub use email::{create_mailer, EmailError, InviteEmail, InviteMailer, LogMailer};
pub use error::{ErrorKind, MembershipError};
pub use identity::{Identity, IdentityResolver, RequestContext, SessionIdentityResolver};
pub use rate_limit::{InviteRateLimiter, MemoryRateLimiter, NoopRateLimiter};
pub use response::ActionResponse;
pub use seats::SeatUsage;
pub use service::{
    CreateOrganization, InviteAccepted, InviteCreated, InviteInfo, MembersData,
    MembershipService, OrganizationSummary, Pagination,
};
