//! Path schema of the console's document tree.
//!
//! Every collection the console touches is addressed through these builders
//! so the layout lives in one place. Store keys may not contain `.`, so
//! emails are escaped with [`escape_email`] before they are used as keys.

use crate::types::{Capability, DoorId, RoomId, UserId};

/// Root of the user profile collection.
pub const USERS: &str = "users";
/// Root of the per-user capped activity index.
pub const RECENT_ACTIVITIES: &str = "recent_activities";
/// Root of the outbound controller notification collection.
pub const NOTIFICATIONS: &str = "esp32_notifications";
/// Root of the pre-registration invite collection.
pub const AUTHORIZED_EMAILS: &str = "authorized_emails";

pub fn user(user_id: &UserId) -> String {
    format!("{USERS}/{user_id}")
}

/// Leaf path of a single capability flag, for field-level permission writes.
pub fn user_permission(user_id: &UserId, capability: Capability) -> String {
    format!("{USERS}/{user_id}/permissions/{}", capability.as_str())
}

pub fn room_grant(room_id: &RoomId, user_id: &UserId) -> String {
    format!("room_access/{room_id}/{user_id}")
}

pub fn authorized_email(email: &str) -> String {
    format!("{AUTHORIZED_EMAILS}/{}", escape_email(email))
}

pub fn authorized_email_permission(email: &str, capability: Capability) -> String {
    format!(
        "{AUTHORIZED_EMAILS}/{}/permissions/{}",
        escape_email(email),
        capability.as_str()
    )
}

pub fn authorized_email_status(email: &str) -> String {
    format!("{AUTHORIZED_EMAILS}/{}/status", escape_email(email))
}

pub fn user_activities(user_id: &UserId) -> String {
    format!("user_activities/{user_id}")
}

pub fn user_activity(user_id: &UserId, activity_id: &str) -> String {
    format!("user_activities/{user_id}/{activity_id}")
}

pub fn recent_activities(user_id: &UserId) -> String {
    format!("{RECENT_ACTIVITIES}/{user_id}")
}

pub fn recent_activity(user_id: &UserId, activity_id: &str) -> String {
    format!("{RECENT_ACTIVITIES}/{user_id}/{activity_id}")
}

pub fn notification(notification_id: &str) -> String {
    format!("{NOTIFICATIONS}/{notification_id}")
}

pub fn door_log(door_id: &DoorId) -> String {
    format!("door_access_logs/{door_id}")
}

pub fn door_event(door_id: &DoorId, event_id: &str) -> String {
    format!("door_access_logs/{door_id}/{event_id}")
}

/// Replace `.` with `,` so an email can be used as a store key.
pub fn escape_email(email: &str) -> String {
    email.replace('.', ",")
}

/// Inverse of [`escape_email`].
pub fn unescape_email(key: &str) -> String {
    key.replace(',', ".")
}
