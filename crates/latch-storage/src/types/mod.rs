//! Type definitions for the console's document tree.

mod access;
mod capabilities;
mod ids;
mod invites;
mod roles;
mod users;

// Re-export all types from submodules
pub use access::*;
pub use capabilities::*;
pub use ids::*;
pub use invites::*;
pub use roles::*;
pub use users::*;
