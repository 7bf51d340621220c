//! Outbound notifications for the door controller.
//!
//! The console writes short notification records into a single global,
//! capped collection. The controller device polls that collection, shows the
//! message on its display and flips `delivered` itself; this crate only ever
//! writes records with `delivered:false`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use latch_storage::{
    format_clock, notification, RealtimeStore, StoreError, UserId, NOTIFICATIONS,
};

/// Most records kept in the collection after pruning.
pub const NOTIFY_RETENTION: usize = 10;
/// How many records a prune pass reads back before deciding what to delete.
pub const NOTIFY_SCAN: usize = 20;

/// Unique identifier for a notification (`notification_<millis>` from the
/// strictly increasing store clock).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn from_timestamp(millis: i64) -> Self {
        Self(format!("notification_{millis}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One message for the controller display.
///
/// Unlike activity records this is a global collection, so `user_id` lives
/// in the value; only `id` comes from the path key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(skip)]
    pub id: NotificationId,
    pub user_id: UserId,
    pub user_name: String,
    pub action: String,
    pub message: String,
    pub timestamp: i64,
    pub delivered: bool,
}

/// Writes controller notifications and keeps the collection capped.
pub struct NotificationBridge {
    store: Arc<dyn RealtimeStore>,
}

impl NotificationBridge {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Queue one notification for the controller.
    ///
    /// The display message is `"<userName> - <HH:MM>"` of the write time.
    /// Pruning runs afterwards and is best-effort; its failure is logged and
    /// swallowed.
    pub async fn notify(
        &self,
        user_id: &UserId,
        user_name: &str,
        action: &str,
    ) -> Result<NotificationRecord, StoreError> {
        let timestamp = self.store.now_millis();
        let record = NotificationRecord {
            id: NotificationId::from_timestamp(timestamp),
            user_id: user_id.clone(),
            user_name: user_name.to_string(),
            action: action.to_string(),
            message: format!("{user_name} - {}", format_clock(timestamp)),
            timestamp,
            delivered: false,
        };
        let value = serde_json::to_value(&record)?;

        self.store
            .write(&notification(record.id.as_str()), value)
            .await?;

        if let Err(error) = self.prune(&record.id).await {
            warn!(?error, "failed to prune controller notifications");
        }

        Ok(record)
    }

    /// Trim the collection back down to [`NOTIFY_RETENTION`] records.
    ///
    /// Same shape as the activity-index prune: scan the newest
    /// [`NOTIFY_SCAN`], delete oldest-first past the cap, never the record
    /// named by `just_written`.
    pub async fn prune(&self, just_written: &NotificationId) -> Result<(), StoreError> {
        let tail = self
            .store
            .query_tail(NOTIFICATIONS, "timestamp", NOTIFY_SCAN)
            .await?;
        if tail.len() <= NOTIFY_RETENTION {
            return Ok(());
        }

        let mut to_delete = tail.len() - NOTIFY_RETENTION;
        for (key, _) in tail {
            if to_delete == 0 {
                break;
            }
            if key == just_written.as_str() {
                continue;
            }
            self.store.delete(&notification(&key)).await?;
            to_delete -= 1;
        }
        Ok(())
    }

    /// One-shot read of the newest notifications, oldest of the window first,
    /// the order the controller consumes them in.
    pub async fn recent(&self, limit: usize) -> Result<Vec<NotificationRecord>, StoreError> {
        let tail = self
            .store
            .query_tail(NOTIFICATIONS, "timestamp", limit)
            .await?;
        Ok(tail
            .iter()
            .filter_map(|(key, raw)| parse_record(key, raw))
            .collect())
    }
}

fn parse_record(key: &str, raw: &Value) -> Option<NotificationRecord> {
    match serde_json::from_value::<NotificationRecord>(raw.clone()) {
        Ok(mut record) => {
            record.id = NotificationId::from(key);
            Some(record)
        }
        Err(error) => {
            warn!(?error, key, "skipping malformed notification record");
            None
        }
    }
}
