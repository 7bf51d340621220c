//! Credential authentication for the physical door units.
//!
//! A door unit submits whatever code was typed at the keypad and gets back a
//! verdict; it is unauthenticated hardware, so this service never raises the
//! console's permission errors. Every attempt, good or bad, lands in the
//! per-door access log. Only successful unlocks are broadcast as user
//! activity; failed codes stay in the audit log and nowhere else.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use latch_activity::ActivityLog;
use latch_notify::NotificationBridge;
use latch_storage::{
    door_event, door_log, format_date_time, DoorId, RealtimeStore, StoreError, UserId,
};

/// Identity bound to a failed attempt with no recognizable code and no claim.
pub const UNKNOWN_USER_ID: &str = "unknown";
pub const UNKNOWN_USER_NAME: &str = "Unknown";

/// How an unlock was requested at the unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMethod {
    #[default]
    Password,
    Card,
    Remote,
    Manual,
}

/// What the unit was asked to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorAction {
    #[default]
    Unlock,
    Lock,
}

/// Unique identifier for a door-access event (`event_<millis>` from the
/// strictly increasing store clock).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn from_timestamp(millis: i64) -> Self {
        Self(format!("event_{millis}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One attempt at a door, stored append-only under
/// `door_access_logs/<doorId>/<eventId>`.
///
/// `passwordUsed` is kept on failed attempts only; successful codes are not
/// echoed back into the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorAccessEvent {
    #[serde(skip)]
    pub id: EventId,
    #[serde(skip)]
    pub door_id: DoorId,
    pub user_id: UserId,
    pub user_name: String,
    pub action: DoorAction,
    pub method: AccessMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_used: Option<String>,
    pub success: bool,
    pub timestamp: i64,
    pub formatted_time: String,
}

/// The answer handed back to the door unit.
#[derive(Clone, Debug, PartialEq)]
pub struct DoorVerdict {
    pub success: bool,
    pub user_id: UserId,
    pub user_name: String,
    pub message: String,
}

/// The identity a failed attempt claims to be, when the unit knows one
/// (e.g. a card was swiped before the code was typed).
#[derive(Clone, Debug, PartialEq)]
pub struct ClaimedIdentity {
    pub user_id: UserId,
    pub user_name: String,
}

/// Validates door entry codes and keeps the per-door audit log.
pub struct DoorAuthService {
    store: Arc<dyn RealtimeStore>,
    activity: Arc<ActivityLog>,
    notify: Arc<NotificationBridge>,
    credentials: HashMap<String, ClaimedIdentity>,
}

impl DoorAuthService {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        activity: Arc<ActivityLog>,
        notify: Arc<NotificationBridge>,
        credentials: HashMap<String, ClaimedIdentity>,
    ) -> Self {
        Self {
            store,
            activity,
            notify,
            credentials,
        }
    }

    /// Decide whether a presented code opens a door.
    ///
    /// Always returns a verdict and always appends one [`DoorAccessEvent`];
    /// even a store failure on the event write only gets logged, because the
    /// hardware caller can do nothing about it. On success the unlock is
    /// additionally recorded as user activity and queued for the controller
    /// display, both best-effort.
    pub async fn authenticate(
        &self,
        door_id: &DoorId,
        door_name: &str,
        presented_credential: &str,
        claimed: Option<ClaimedIdentity>,
    ) -> DoorVerdict {
        let verdict = match self.credentials.get(presented_credential) {
            Some(identity) => DoorVerdict {
                success: true,
                user_id: identity.user_id.clone(),
                user_name: identity.user_name.clone(),
                message: format!("access granted: {door_name}"),
            },
            None => {
                let identity = claimed.unwrap_or(ClaimedIdentity {
                    user_id: UserId::from(UNKNOWN_USER_ID),
                    user_name: UNKNOWN_USER_NAME.to_string(),
                });
                DoorVerdict {
                    success: false,
                    user_id: identity.user_id,
                    user_name: identity.user_name,
                    message: format!("access denied: {door_name}"),
                }
            }
        };

        if let Err(error) = self.persist_event(door_id, presented_credential, &verdict).await {
            warn!(?error, door = %door_id, "failed to persist door access event");
        }

        if verdict.success {
            info!(door = %door_id, user = %verdict.user_id, "door unlocked");
            let action = format!("unlocked {door_name}");
            if let Err(error) = self
                .activity
                .record(
                    &verdict.user_id,
                    &verdict.user_name,
                    &action,
                    &format!("door unit {door_id}"),
                )
                .await
            {
                warn!(?error, door = %door_id, "failed to record unlock activity");
            }
            if let Err(error) = self
                .notify
                .notify(&verdict.user_id, &verdict.user_name, &action)
                .await
            {
                warn!(?error, door = %door_id, "failed to notify controller of unlock");
            }
        } else {
            info!(door = %door_id, user = %verdict.user_id, "door access denied");
        }

        verdict
    }

    /// One-shot read of a door's newest events, oldest of the window first.
    pub async fn recent_events(
        &self,
        door_id: &DoorId,
        limit: usize,
    ) -> Result<Vec<DoorAccessEvent>, StoreError> {
        let tail = self
            .store
            .query_tail(&door_log(door_id), "timestamp", limit)
            .await?;
        Ok(tail
            .iter()
            .filter_map(|(key, raw)| parse_event(door_id, key, raw))
            .collect())
    }

    async fn persist_event(
        &self,
        door_id: &DoorId,
        presented_credential: &str,
        verdict: &DoorVerdict,
    ) -> Result<(), StoreError> {
        let timestamp = self.store.now_millis();
        let event = DoorAccessEvent {
            id: EventId::from_timestamp(timestamp),
            door_id: door_id.clone(),
            user_id: verdict.user_id.clone(),
            user_name: verdict.user_name.clone(),
            action: DoorAction::Unlock,
            method: AccessMethod::Password,
            password_used: (!verdict.success).then(|| presented_credential.to_string()),
            success: verdict.success,
            timestamp,
            formatted_time: format_date_time(timestamp),
        };
        self.store
            .write(
                &door_event(door_id, event.id.as_str()),
                serde_json::to_value(&event)?,
            )
            .await
    }
}

fn parse_event(door_id: &DoorId, key: &str, raw: &Value) -> Option<DoorAccessEvent> {
    match serde_json::from_value::<DoorAccessEvent>(raw.clone()) {
        Ok(mut event) => {
            event.id = EventId::from(key);
            event.door_id = door_id.clone();
            Some(event)
        }
        Err(error) => {
            warn!(?error, key, "skipping malformed door access event");
            None
        }
    }
}
