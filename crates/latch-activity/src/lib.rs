//! Activity history for the latch console.
//!
//! Every noteworthy action a user performs (signing in, unlocking a door,
//! having access granted or revoked) is recorded twice: once in the user's
//! permanent history and once in a capped per-user recent index that
//! dashboards watch in realtime.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use latch_storage::{
    format_date_time, recent_activities, recent_activity, user_activity, RealtimeStore,
    StoreError, UserId, RECENT_ACTIVITIES,
};

/// Most records kept in a user's recent index after pruning.
pub const RECENT_RETENTION: usize = 20;
/// How many records a prune pass reads back before deciding what to delete.
pub const RECENT_SCAN: usize = 30;

/// Unique identifier for an activity record.
///
/// Derived from the store clock (`activity_<millis>`). The clock is strictly
/// increasing, so records written back-to-back never collide and ascending
/// id order equals creation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityId(pub String);

impl ActivityId {
    pub fn from_timestamp(millis: i64) -> Self {
        Self(format!("activity_{millis}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActivityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One recorded user action.
///
/// `id` and `user_id` live in the record's store path, not in its value, so
/// both are skipped during (de)serialization and filled back in from the
/// path keys on read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(skip)]
    pub id: ActivityId,
    #[serde(skip)]
    pub user_id: UserId,
    pub user_name: String,
    pub action: String,
    pub timestamp: i64,
    pub formatted_time: String,
    pub device_info: String,
}

/// Push-based feed of "current top records, newest first" frames.
/// Dropping the stream unsubscribes.
pub type ActivityFeed = Pin<Box<dyn Stream<Item = Vec<ActivityRecord>> + Send>>;

/// Records and serves per-user activity history.
pub struct ActivityLog {
    store: Arc<dyn RealtimeStore>,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Record one action for a user.
    ///
    /// The record is written to the user's full history and to their recent
    /// index, then the recent index is pruned. A failed prune is logged and
    /// swallowed; the record call itself only fails if a primary write does.
    pub async fn record(
        &self,
        user_id: &UserId,
        user_name: &str,
        action: &str,
        device_info: &str,
    ) -> Result<ActivityRecord, StoreError> {
        let timestamp = self.store.now_millis();
        let record = ActivityRecord {
            id: ActivityId::from_timestamp(timestamp),
            user_id: user_id.clone(),
            user_name: user_name.to_string(),
            action: action.to_string(),
            timestamp,
            formatted_time: format_date_time(timestamp),
            device_info: device_info.to_string(),
        };
        let value = serde_json::to_value(&record)?;

        self.store
            .write(&user_activity(user_id, record.id.as_str()), value.clone())
            .await?;
        self.store
            .write(&recent_activity(user_id, record.id.as_str()), value)
            .await?;

        if let Err(error) = self.prune_recent(user_id, &record.id).await {
            warn!(?error, user = %user_id, "failed to prune recent activities");
        }

        Ok(record)
    }

    /// Trim a user's recent index back down to [`RECENT_RETENTION`] records.
    ///
    /// Reads back at most [`RECENT_SCAN`] of the newest records and deletes
    /// oldest-first past the cap. The record named by `just_written` is never
    /// deleted, even when a stale read puts it among the oldest.
    pub async fn prune_recent(
        &self,
        user_id: &UserId,
        just_written: &ActivityId,
    ) -> Result<(), StoreError> {
        let tail = self
            .store
            .query_tail(&recent_activities(user_id), "timestamp", RECENT_SCAN)
            .await?;
        if tail.len() <= RECENT_RETENTION {
            return Ok(());
        }

        let mut to_delete = tail.len() - RECENT_RETENTION;
        for (key, _) in tail {
            if to_delete == 0 {
                break;
            }
            if key == just_written.as_str() {
                continue;
            }
            self.store.delete(&recent_activity(user_id, &key)).await?;
            to_delete -= 1;
        }
        Ok(())
    }

    /// One-shot read of a user's newest records, newest first.
    pub async fn recent(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let tail = self
            .store
            .query_tail(&recent_activities(user_id), "timestamp", limit)
            .await?;
        let mut records: Vec<ActivityRecord> = tail
            .iter()
            .filter_map(|(key, raw)| parse_record(user_id, key, raw))
            .collect();
        order_newest_first(&mut records);
        Ok(records)
    }

    /// Watch one user's recent index.
    ///
    /// Yields the current top-`limit` records immediately and again after
    /// every change to the index.
    pub async fn subscribe(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<ActivityFeed, StoreError> {
        let watch = self.store.subscribe(&recent_activities(user_id)).await?;
        let user_id = user_id.clone();
        let feed = watch.map(move |event| {
            let mut records = parse_user_feed(&user_id, event.value.as_ref());
            order_newest_first(&mut records);
            records.truncate(limit);
            records
        });
        Ok(Box::pin(feed))
    }

    /// Watch every user's recent index at once, flattened into one feed.
    /// This is the admin dashboard view.
    pub async fn subscribe_all(&self, limit: usize) -> Result<ActivityFeed, StoreError> {
        let watch = self.store.subscribe(RECENT_ACTIVITIES).await?;
        let feed = watch.map(move |event| {
            let mut records = Vec::new();
            if let Some(Value::Object(users)) = event.value.as_ref() {
                for (uid, subtree) in users {
                    let user_id = UserId::from(uid.as_str());
                    records.extend(parse_user_feed(&user_id, Some(subtree)));
                }
            }
            order_newest_first(&mut records);
            records.truncate(limit);
            records
        });
        Ok(Box::pin(feed))
    }
}

fn parse_user_feed(user_id: &UserId, value: Option<&Value>) -> Vec<ActivityRecord> {
    let Some(Value::Object(children)) = value else {
        return Vec::new();
    };
    children
        .iter()
        .filter_map(|(key, raw)| parse_record(user_id, key, raw))
        .collect()
}

fn parse_record(user_id: &UserId, key: &str, raw: &Value) -> Option<ActivityRecord> {
    match serde_json::from_value::<ActivityRecord>(raw.clone()) {
        Ok(mut record) => {
            record.id = ActivityId::from(key);
            record.user_id = user_id.clone();
            Some(record)
        }
        Err(error) => {
            // One malformed record must not take the whole feed down
            warn!(?error, key, "skipping malformed activity record");
            None
        }
    }
}

/// Timestamp descending, ties broken by id ascending.
fn order_newest_first(records: &mut [ActivityRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}
