//! Membership service tests.
//!
//! Tests are organized into modules by feature area:
//! - `common` - Shared test helpers and utilities
//! - `invites` - Invite creation, cancellation and seat checks
//! - `accept` - Invite acceptance and lazy expiry
//! - `members` - Removal, role changes and the members view
//! - `concurrency` - Seat invariant and single-use tokens under concurrent requests
//! - `failures` - Store failure handling with a mocked store

pub mod common;

mod accept;
