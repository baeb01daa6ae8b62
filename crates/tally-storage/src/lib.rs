//! Storage abstraction for tally.
//!
//! Backend crates (e.g., tally-store-sqlite) implement [`Store`] so `tally-members`
//! doesn't depend on any specific database engine or schema details.
//!
//! Every method that reads or mutates tenant data takes an explicit
//! [`OrganizationId`]; there is no way to address a membership or invite row by user or
//! invite id alone.

mod store;
pub mod types;

use thiserror::Error;

pub use store::Store;
#[cfg(feature = "test-support")]
pub use store::MockStore;
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    /// Raised by the store-side seat guard. The message is authoritative and safe to show.
    #[error("{0}")]
    SeatLimit(String),
    #[error("backend error: {0}")]
    Backend(String),
}
