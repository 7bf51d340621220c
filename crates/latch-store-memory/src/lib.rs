//! In-memory realtime store backed by a JSON document tree.
//!
//! This implementation is suitable for:
//! - Single-process deployments
//! - Development and testing
//! - Driving the console services without a hosted realtime database
//!
//! Watches are fanned out over tokio broadcast channels, so change events
//! never leave the process.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use latch_storage::{RealtimeStore, StoreError, StoreEvent, WatchStream};

const CHANNEL_CAPACITY: usize = 100;

/// Characters a path segment must not contain, matching what hosted realtime
/// databases reject in keys.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

/// In-memory [`RealtimeStore`] using a single JSON tree behind an RwLock.
///
/// Every write replaces the subtree at its path and notifies all watchers
/// whose watched path overlaps the written one. Timestamps come from a
/// strictly increasing millisecond clock, so two records stored back-to-back
/// never share a timestamp.
pub struct MemoryStore {
    tree: Arc<RwLock<Value>>,
    channels: Arc<DashMap<String, broadcast::Sender<StoreEvent>>>,
    clock: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(Value::Object(Map::new()))),
            channels: Arc::new(DashMap::new()),
            clock: AtomicI64::new(0),
        }
    }

    /// Get or create a broadcast channel for a watched path
    fn get_or_create_channel(&self, path: &str) -> broadcast::Sender<StoreEvent> {
        self.channels
            .entry(path.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Notify every watcher whose path overlaps `changed`.
    ///
    /// Called with the tree lock held so the snapshot each watcher receives is
    /// the one produced by the triggering write. Channels nobody listens to
    /// anymore are dropped along the way.
    fn fan_out(&self, tree: &Value, changed: &str) {
        self.channels.retain(|watched, tx| {
            if tx.receiver_count() == 0 {
                return false;
            }
            if overlaps(watched, changed) {
                let value = match split_path(watched) {
                    Ok(segments) => subtree(tree, &segments).cloned(),
                    Err(_) => None,
                };
                // Ignore error if no receivers (this is fine)
                let _ = tx.send(StoreEvent {
                    path: watched.clone(),
                    value,
                });
            }
            true
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        let tree = self.tree.read().await;
        Ok(subtree(&tree, &segments).cloned())
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut tree = self.tree.write().await;
        if value.is_null() {
            // Writing null removes the subtree, like set(null) on a hosted store
            delete_in(&mut tree, &segments);
        } else {
            write_in(&mut tree, &segments, value);
        }
        self.fan_out(&tree, path);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut tree = self.tree.write().await;
        if delete_in(&mut tree, &segments) {
            self.fan_out(&tree, path);
        }
        Ok(())
    }

    async fn query_tail(
        &self,
        path: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let segments = split_path(path)?;
        let tree = self.tree.read().await;
        let Some(Value::Object(children)) = subtree(&tree, &segments) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(String, Value)> = children
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        // Children missing the order field sort first; ties break on key
        entries.sort_by(|(ka, va), (kb, vb)| {
            let fa = va.get(order_by).and_then(Value::as_i64);
            let fb = vb.get(order_by).and_then(Value::as_i64);
            fa.cmp(&fb).then_with(|| ka.cmp(kb))
        });
        if entries.len() > limit {
            entries.drain(..entries.len() - limit);
        }
        Ok(entries)
    }

    async fn subscribe(&self, path: &str) -> Result<WatchStream, StoreError> {
        let segments = split_path(path)?;

        // Take the write lock so the initial snapshot and the receiver are
        // created atomically with respect to writers: no change can land
        // between the two and go unseen.
        let tree = self.tree.write().await;
        let tx = self.get_or_create_channel(path);
        let rx = tx.subscribe();
        let initial = StoreEvent {
            path: path.to_string(),
            value: subtree(&tree, &segments).cloned(),
        };
        drop(tree);

        // Filter out lagged errors (happens when receiver can't keep up);
        // the next snapshot carries the full state anyway
        let changes = BroadcastStream::new(rx).filter_map(|result| result.ok());
        Ok(Box::pin(tokio_stream::once(initial).chain(changes)))
    }

    fn now_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.clock.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev + 1);
            match self
                .clock
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(current) => prev = current,
            }
        }
    }
}

// ───── Path helpers ─────

fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath("empty path".to_string()));
    }
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(StoreError::InvalidPath(format!(
                "empty segment in '{path}'"
            )));
        }
        if segment.contains(FORBIDDEN) {
            return Err(StoreError::InvalidPath(format!(
                "forbidden character in '{path}'"
            )));
        }
    }
    Ok(segments)
}

/// Whether a write at `changed` is visible from a watch at `watched`.
fn overlaps(watched: &str, changed: &str) -> bool {
    covers(watched, changed) || covers(changed, watched)
}

fn covers(outer: &str, inner: &str) -> bool {
    inner
        .strip_prefix(outer)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

// ───── Tree helpers ─────

fn subtree<'a>(node: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut current = node;
    for segment in segments {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

fn write_in(node: &mut Value, segments: &[&str], value: Value) {
    if !node.is_object() {
        // A scalar in the way of a deeper write gets replaced by an object
        *node = Value::Object(Map::new());
    }
    if let Value::Object(children) = node {
        let key = segments[0].to_string();
        if segments.len() == 1 {
            children.insert(key, value);
        } else {
            let child = children.entry(key).or_insert(Value::Object(Map::new()));
            write_in(child, &segments[1..], value);
        }
    }
}

/// Remove the subtree at `segments`, pruning parents that end up empty.
/// Returns whether anything was removed.
fn delete_in(node: &mut Value, segments: &[&str]) -> bool {
    let Some(children) = node.as_object_mut() else {
        return false;
    };
    let key = segments[0];
    if segments.len() == 1 {
        return children.remove(key).is_some();
    }
    let Some(child) = children.get_mut(key) else {
        return false;
    };
    let removed = delete_in(child, &segments[1..]);
    if removed && child.as_object().is_some_and(Map::is_empty) {
        children.remove(key);
    }
    removed
}
