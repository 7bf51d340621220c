//! User profile types.

use serde::{Deserialize, Serialize};

use super::{Capability, PermissionSet, Role, UserId};

/// A console identity as stored under `users/<userId>`.
///
/// The id is the path key, not part of the stored value; readers fill it
/// back in after deserializing. A stored profile may predate the
/// role/permission fields; a missing role reads as `user` and a missing
/// permission map reads as the new-user defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(skip)]
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "PermissionSet::new_user")]
    pub permissions: PermissionSet,
}

impl UserProfile {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    /// Effective check for one capability: the owner always passes, everyone
    /// else is exactly their stored map.
    pub fn can(&self, capability: Capability) -> bool {
        self.is_owner() || self.permissions.allows(capability)
    }

    /// The whole effective map: all four for the owner, the stored map
    /// otherwise.
    pub fn effective_capabilities(&self) -> PermissionSet {
        if self.is_owner() {
            PermissionSet::full()
        } else {
            self.permissions
        }
    }
}
