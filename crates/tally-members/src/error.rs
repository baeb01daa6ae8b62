//! Error taxonomy for membership operations.

use serde::Serialize;
use tally_storage::StoreError;
use thiserror::Error;

/// Coarse classification of a [`MembershipError`], exposed to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Unauthenticated,
    Unauthorized,
    NotFound,
    Conflict,
    SeatLimitExceeded,
    SeatLimitNotConfigured,
    RateLimited,
    InviteExpired,
    InviteNotPending,
    SelfModification,
    StoreFailure,
}

/// Every error message is safe to show to the caller as-is.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("You must be signed in to perform this action")]
    Unauthenticated,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    SeatLimitExceeded(String),

    #[error("Seat limit is not configured for this organization. Please contact support.")]
    SeatLimitNotConfigured,

    #[error("Too many invites sent. Please try again later.")]
    RateLimited,

    #[error("This invite has expired. Ask the organization owner to send a new one.")]
    InviteExpired,

    #[error("This invite is no longer valid (status: {0})")]
    InviteNotPending(tally_storage::InviteStatus),

    #[error("{0}")]
    SelfModification(String),

    #[error("{0}")]
    StoreFailure(String),
}

impl MembershipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MembershipError::InvalidInput(_) => ErrorKind::InvalidInput,
            MembershipError::Unauthenticated => ErrorKind::Unauthenticated,
            MembershipError::Unauthorized(_) => ErrorKind::Unauthorized,
            MembershipError::NotFound(_) => ErrorKind::NotFound,
            MembershipError::Conflict(_) => ErrorKind::Conflict,
            MembershipError::SeatLimitExceeded(_) => ErrorKind::SeatLimitExceeded,
            MembershipError::SeatLimitNotConfigured => ErrorKind::SeatLimitNotConfigured,
            MembershipError::RateLimited => ErrorKind::RateLimited,
            MembershipError::InviteExpired => ErrorKind::InviteExpired,
            MembershipError::InviteNotPending(_) => ErrorKind::InviteNotPending,
            MembershipError::SelfModification(_) => ErrorKind::SelfModification,
            MembershipError::StoreFailure(_) => ErrorKind::StoreFailure,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        MembershipError::InvalidInput(msg.into())
    }

    pub(crate) fn unauthorized(msg: impl Into<String>) -> Self {
        MembershipError::Unauthorized(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        MembershipError::NotFound(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        MembershipError::Conflict(msg.into())
    }

    /// Map a store failure with a context-specific message for `NotFound`.
    pub(crate) fn from_store(e: StoreError, not_found: &str) -> Self {
        match e {
            StoreError::NotFound => MembershipError::not_found(not_found),
            other => other.into(),
        }
    }
}

/// Seat-guard rejections pass through verbatim; every other backend failure becomes a
/// generic message and its detail is only logged.
impl From<StoreError> for MembershipError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SeatLimit(msg) => MembershipError::SeatLimitExceeded(msg),
            StoreError::NotFound => MembershipError::not_found("Not found"),
            StoreError::AlreadyExists => MembershipError::conflict("Already exists"),
            StoreError::Conflict => {
                MembershipError::conflict("The request conflicted with a concurrent change")
            }
            StoreError::Backend(detail) => {
                tracing::error!(error = %detail, "Store operation failed");
                MembershipError::StoreFailure(
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        }
    }
}
