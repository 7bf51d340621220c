//! Console roles.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of a console identity.
///
/// Exactly one identity holds `Owner`; it is determined by the configured
/// owner email, not by anything stored. `Admin` and `User` are ordinary
/// stored roles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    #[default]
    User,
}

/// Error type for parsing Role from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(pub String);

impl std::fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Check if this role has at least the standing of another role
    pub fn includes(&self, other: &Role) -> bool {
        match self {
            Role::Owner => true, // Owner includes everything
            Role::Admin => matches!(other, Role::Admin | Role::User),
            Role::User => matches!(other, Role::User),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Owner, Role::Admin, Role::User] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_parse_invalid() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err, ParseRoleError("superuser".to_string()));
        assert!(err.to_string().contains("superuser"));
    }

    #[test]
    fn test_role_includes_hierarchy() {
        assert!(Role::Owner.includes(&Role::Admin));
        assert!(Role::Owner.includes(&Role::User));
        assert!(Role::Admin.includes(&Role::User));
        assert!(!Role::Admin.includes(&Role::Owner));
        assert!(!Role::User.includes(&Role::Admin));
        assert!(Role::User.includes(&Role::User));
    }

    #[test]
    fn test_role_default_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_value(Role::Owner).unwrap(), serde_json::json!("owner"));
        let role: Role = serde_json::from_value(serde_json::json!("admin")).unwrap();
        assert_eq!(role, Role::Admin);
    }
}
