//! Permission and access control for the latch console.
//!
//! This crate owns who a user is ([`PermissionDirectory`]), what they are
//! allowed to do ([`Session`] and its authorization gate), which rooms they
//! can open ([`AccessRegistry`]) and who may register in the first place
//! ([`AuthorizedEmails`]). Everything is backed by the shared realtime store;
//! there is no client-side locking, concurrent writers converge on
//! last-write-wins.

mod error;
mod invites;
mod permissions;
mod registry;
mod session;

pub use error::*;
pub use invites::*;
pub use permissions::*;
pub use registry::*;
pub use session::*;

/// `deviceInfo` recorded for actions performed through the console UI.
pub const CONSOLE_DEVICE_INFO: &str = "web console";
