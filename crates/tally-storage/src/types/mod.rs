//! Type definitions for tally storage.

mod ids;
mod invites;
mod organizations;
mod profiles;
mod roles;

// Re-export all types from submodules
pub use ids::*;
pub use invites::*;
pub use organizations::*;
pub use profiles::*;
pub use roles::*;
