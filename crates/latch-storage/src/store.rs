//! The realtime document-store trait that backends implement.

use std::pin::Pin;

use futures::Stream;
use serde_json::Value;

use crate::StoreError;

/// A change notification for a watched path.
///
/// `value` is the full subtree at the watched path after the change, or
/// `None` when nothing exists there anymore.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreEvent {
    pub path: String,
    pub value: Option<Value>,
}

/// Long-lived stream of [`StoreEvent`]s; dropping it cancels the watch.
pub type WatchStream = Pin<Box<dyn Stream<Item = StoreEvent> + Send>>;

/// The store contract the console services depend on.
///
/// Paths address a JSON document tree with `/`-separated string keys, the way
/// a realtime database does. Writes replace the whole subtree at the path;
/// partial updates are expressed as writes to leaf paths. All operations are
/// last-write-wins; no multi-path transaction is offered or assumed.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait RealtimeStore: Send + Sync {
    /// One-shot read of the subtree at `path` (`None` if absent).
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the subtree at `path` with `value`, creating parents as needed.
    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Remove the subtree at `path`. Removing an absent path is a no-op.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// The last `limit` children of the node at `path`, ordered ascending by
    /// the child field `order_by` (children missing the field sort first,
    /// ties broken by key). Returns `(key, value)` pairs in that order.
    async fn query_tail(
        &self,
        path: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, StoreError>;

    /// Watch the subtree at `path`. The stream yields the current snapshot
    /// immediately and then again after every change under the path.
    /// Consecutive identical snapshots may be delivered; consumers that care
    /// deduplicate.
    async fn subscribe(&self, path: &str) -> Result<WatchStream, StoreError>;

    /// Server-assigned milliseconds since the epoch, strictly increasing
    /// across calls. Used for every stored `timestamp` field.
    fn now_millis(&self) -> i64;
}
