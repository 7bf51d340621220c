//! Capability flags gating administrative actions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four named permission flags.
///
/// The set is closed: permission maps never carry other keys, and every
/// lookup of an unset flag has a defined default instead of "undefined".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    ManageUsers,
    ManageAccess,
    ViewLogs,
    ManageDoors,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ManageUsers,
        Capability::ManageAccess,
        Capability::ViewLogs,
        Capability::ManageDoors,
    ];

    /// Wire name, matching the keys of stored permission maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageUsers => "manageUsers",
            Capability::ManageAccess => "manageAccess",
            Capability::ViewLogs => "viewLogs",
            Capability::ManageDoors => "manageDoors",
        }
    }
}

/// Error type for parsing Capability from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCapabilityError(pub String);

impl std::fmt::Display for ParseCapabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid capability: {}", self.0)
    }
}

impl std::error::Error for ParseCapabilityError {}

impl FromStr for Capability {
    type Err = ParseCapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manageUsers" => Ok(Capability::ManageUsers),
            "manageAccess" => Ok(Capability::ManageAccess),
            "viewLogs" => Ok(Capability::ViewLogs),
            "manageDoors" => Ok(Capability::ManageDoors),
            _ => Err(ParseCapabilityError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A full permission map: one boolean per capability.
///
/// Individual flags missing from a stored map read as `false`; the
/// creation-time defaults live in [`PermissionSet::new_user`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    #[serde(default)]
    pub manage_users: bool,
    #[serde(default)]
    pub manage_access: bool,
    #[serde(default)]
    pub view_logs: bool,
    #[serde(default)]
    pub manage_doors: bool,
}

impl PermissionSet {
    /// Defaults seeded for a newly created identity: only `viewLogs`.
    pub fn new_user() -> Self {
        Self {
            view_logs: true,
            ..Self::default()
        }
    }

    /// All four flags set; what the owner always resolves to.
    pub fn full() -> Self {
        Self {
            manage_users: true,
            manage_access: true,
            view_logs: true,
            manage_doors: true,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageUsers => self.manage_users,
            Capability::ManageAccess => self.manage_access,
            Capability::ViewLogs => self.view_logs,
            Capability::ManageDoors => self.manage_doors,
        }
    }

    pub fn set(&mut self, capability: Capability, value: bool) {
        match capability {
            Capability::ManageUsers => self.manage_users = value,
            Capability::ManageAccess => self.manage_access = value,
            Capability::ViewLogs => self.view_logs = value,
            Capability::ManageDoors => self.manage_doors = value,
        }
    }

    /// Every flag with its current value, in declaration order.
    pub fn entries(&self) -> [(Capability, bool); 4] {
        [
            (Capability::ManageUsers, self.manage_users),
            (Capability::ManageAccess, self.manage_access),
            (Capability::ViewLogs, self.view_logs),
            (Capability::ManageDoors, self.manage_doors),
        ]
    }
}

/// A partial permission change: only the supplied flags are touched.
///
/// This is the field-level merge shape of permission updates. Flags left
/// `None` keep whatever is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_users: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_logs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_doors: Option<bool>,
}

impl PermissionUpdate {
    /// Update touching a single capability.
    pub fn single(capability: Capability, value: bool) -> Self {
        Self::default().with(capability, value)
    }

    pub fn with(mut self, capability: Capability, value: bool) -> Self {
        match capability {
            Capability::ManageUsers => self.manage_users = Some(value),
            Capability::ManageAccess => self.manage_access = Some(value),
            Capability::ViewLogs => self.view_logs = Some(value),
            Capability::ManageDoors => self.manage_doors = Some(value),
        }
        self
    }

    /// The supplied flags only, in declaration order.
    pub fn entries(&self) -> Vec<(Capability, bool)> {
        let mut out = Vec::new();
        if let Some(v) = self.manage_users {
            out.push((Capability::ManageUsers, v));
        }
        if let Some(v) = self.manage_access {
            out.push((Capability::ManageAccess, v));
        }
        if let Some(v) = self.view_logs {
            out.push((Capability::ViewLogs, v));
        }
        if let Some(v) = self.manage_doors {
            out.push((Capability::ManageDoors, v));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Merge the supplied flags into `target`, leaving the rest untouched.
    pub fn apply_to(&self, target: &mut PermissionSet) {
        for (capability, value) in self.entries() {
            target.set(capability, value);
        }
    }
}
