//! Room access grant types.

use serde::{Deserialize, Serialize};

use super::{RoomId, UserId};

/// Level of a room grant. The console currently only hands out `Full`;
/// `Limited` exists for deployments that scope grants by schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Full,
    Limited,
}

/// Lifecycle state of a grant record.
///
/// Revocation deletes the record, so `Revoked` is never written by the
/// console; it exists so foreign records carrying the state still parse and
/// are treated as not granting access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantStatus {
    #[default]
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "revoked-by-deletion")]
    Revoked,
}

/// A user's permission to access one room, stored under
/// `room_access/<roomId>/<userId>`. Existence of the record is the grant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub user_name: String,
    pub granted_at: i64,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub status: GrantStatus,
}

impl AccessGrant {
    pub fn is_active(&self) -> bool {
        self.status == GrantStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_serializes_camel_case() {
        let grant = AccessGrant {
            room_id: RoomId::from("room1"),
            user_id: UserId::from("u1"),
            user_name: "Alice".to_string(),
            granted_at: 1_000,
            access_level: AccessLevel::Full,
            status: GrantStatus::Active,
        };
        assert_eq!(
            serde_json::to_value(&grant).unwrap(),
            serde_json::json!({
                "roomId": "room1",
                "userId": "u1",
                "userName": "Alice",
                "grantedAt": 1000,
                "accessLevel": "full",
                "status": "active"
            })
        );
    }

    #[test]
    fn test_grant_deserialize_defaults() {
        let grant: AccessGrant = serde_json::from_value(serde_json::json!({
            "roomId": "room2",
            "userId": "u2",
            "userName": "Bob",
            "grantedAt": 5
        }))
        .unwrap();
        assert_eq!(grant.access_level, AccessLevel::Full);
        assert!(grant.is_active());
    }

    #[test]
    fn test_revoked_status_wire_name() {
        let status: GrantStatus =
            serde_json::from_value(serde_json::json!("revoked-by-deletion")).unwrap();
        assert_eq!(status, GrantStatus::Revoked);
    }
}
