//! The key/value + query store contract and its in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StoreResult;

/// Abstract key/value + prefix-query store.
///
/// The durable production backend and the in-process fallback implement
/// the identical interface, so callers never branch on which tier served
/// them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Insert or replace a record.
    async fn put(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Fetch a record by key.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Fetch all records whose key starts with `prefix`, sorted by key.
    async fn query(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>>;
}

/// In-process store, safe for concurrent access across jobs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True when no records are held.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &str, value: Value) -> StoreResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn query(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        let entries = self.entries.read().await;
        let mut matched: Vec<(String, Value)> = entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matched)
    }
}
