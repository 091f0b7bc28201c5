//! Offline policy and local payload storage.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::OperationRequest;

/// Ordering of cache and remote sources for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStrategy {
    /// Always ask the server, never read the cache.
    RemoteOnly,
    /// Serve from the cache only.
    CacheOnly,
    /// Ask the server; fall back to the cache when it cannot be reached.
    #[default]
    RemoteFirst,
    /// Serve from the cache; ask the server on a miss.
    CacheFirst,
}

impl CacheStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStrategy::RemoteOnly => "remote-only",
            CacheStrategy::CacheOnly => "cache-only",
            CacheStrategy::RemoteFirst => "remote-first",
            CacheStrategy::CacheFirst => "cache-first",
        }
    }

    /// Strict parse of a policy name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "remote-only" => Some(CacheStrategy::RemoteOnly),
            "cache-only" => Some(CacheStrategy::CacheOnly),
            "remote-first" => Some(CacheStrategy::RemoteFirst),
            "cache-first" => Some(CacheStrategy::CacheFirst),
            _ => None,
        }
    }

    /// Lenient parse used by screenlets: missing or unknown names fall back
    /// to remote-first.
    pub fn from_policy(name: Option<&str>) -> Self {
        match name {
            None => CacheStrategy::default(),
            Some(name) => Self::parse(name).unwrap_or_else(|| {
                tracing::warn!(policy = %name, "Unknown offline policy, using remote-first");
                CacheStrategy::default()
            }),
        }
    }
}

/// Local store consulted by the operation dispatcher.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    /// Keep a write that could not reach the server for a later sync.
    fn store_pending_write(&self, request: OperationRequest);

    /// Drain writes stored while offline, oldest first.
    fn take_pending_writes(&self) -> Vec<OperationRequest>;
}

/// In-memory [`CacheStore`].
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Value>>,
    pending: Mutex<Vec<OperationRequest>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn pending_writes(&self) -> usize {
        self.pending.lock().len()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.entries.lock().insert(key.to_string(), value);
    }

    fn store_pending_write(&self, request: OperationRequest) {
        self.pending.lock().push(request);
    }

    fn take_pending_writes(&self) -> Vec<OperationRequest> {
        std::mem::take(&mut *self.pending.lock())
    }
}
