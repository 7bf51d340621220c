//! Pre-registration invite types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PermissionSet;

/// Registration state of an authorized email.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    #[default]
    Pending,
    Registered,
}

/// An email authorized ahead of registration, stored under
/// `authorized_emails/<escapedEmail>`.
///
/// When the invitee registers, the entry's permission map seeds their new
/// identity instead of the defaults, and `status` flips to `registered`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedEmail {
    pub email: String,
    #[serde(default = "PermissionSet::new_user")]
    pub permissions: PermissionSet,
    pub invited_at: DateTime<Utc>,
    #[serde(default)]
    pub status: InviteStatus,
}

impl AuthorizedEmail {
    pub fn is_pending(&self) -> bool {
        self.status == InviteStatus::Pending
    }
}
