//! Durable-first store with an observable in-memory fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::StoreResult;
use crate::store::{KeyValueStore, MemoryStore};

/// Two-tier store: every mutation is attempted against the durable
/// backend first; on failure it lands in the in-process tier instead, so
/// job tracking never hard-fails a request. Each degradation is emitted as
/// a structured warning plus a metrics counter; the fallback is explicit
/// and observable, never a silent swallow.
pub struct FallbackStore {
    durable: Arc<dyn KeyValueStore>,
    memory: MemoryStore,
    degraded_ops: AtomicU64,
}

impl FallbackStore {
    pub fn new(durable: Arc<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            memory: MemoryStore::new(),
            degraded_ops: 0.into(),
        }
    }

    /// Number of operations served by the fallback tier so far.
    pub fn degraded_operations(&self) -> u64 {
        self.degraded_ops.load(Ordering::Relaxed)
    }

    fn record_degradation(&self, operation: &'static str, key: &str, error: &dyn std::fmt::Display) {
        self.degraded_ops.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reel_store_fallback_operations", "operation" => operation).increment(1);
        warn!(
            operation,
            key,
            error = %error,
            "Durable store unavailable, serving from in-memory fallback"
        );
    }
}

#[async_trait]
impl KeyValueStore for FallbackStore {
    async fn put(&self, key: &str, value: Value) -> StoreResult<()> {
        match self.durable.put(key, value.clone()).await {
            Ok(()) => {
                // Shadow into memory so reads stay coherent if the durable
                // tier drops out between this write and the next read.
                self.memory.put(key, value).await
            }
            Err(e) => {
                self.record_degradation("put", key, &e);
                self.memory.put(key, value).await
            }
        }
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        match self.durable.get(key).await {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => self.memory.get(key).await,
            Err(e) => {
                self.record_degradation("get", key, &e);
                self.memory.get(key).await
            }
        }
    }

    async fn query(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        match self.durable.query(prefix).await {
            Ok(mut durable_rows) => {
                // Fold in records that only ever reached the memory tier.
                let memory_rows = self.memory.query(prefix).await?;
                for (key, value) in memory_rows {
                    if !durable_rows.iter().any(|(k, _)| *k == key) {
                        durable_rows.push((key, value));
                    }
                }
                durable_rows.sort_by(|a, b| a.0.cmp(&b.0));
                Ok(durable_rows)
            }
            Err(e) => {
                self.record_degradation("query", prefix, &e);
                self.memory.query(prefix).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use serde_json::json;
    use std::sync::atomic::AtomicBool;

    /// Durable store that can be switched off mid-test.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        down: AtomicBool,
    }

    impl FlakyStore {
        fn go_down(&self) {
            self.down.store(true, Ordering::SeqCst);
        }

        fn check(&self) -> StoreResult<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable("durable store down"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn put(&self, key: &str, value: Value) -> StoreResult<()> {
            self.check()?;
            self.inner.put(key, value).await
        }

        async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
            self.check()?;
            self.inner.get(key).await
        }

        async fn query(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
            self.check()?;
            self.inner.query(prefix).await
        }
    }

    #[tokio::test]
    async fn healthy_durable_store_serves_reads() {
        let durable = Arc::new(FlakyStore::default());
        let store = FallbackStore::new(durable);

        store.put("jobs/a", json!({"p": 1})).await.unwrap();
        assert_eq!(store.get("jobs/a").await.unwrap().unwrap()["p"], 1);
        assert_eq!(store.degraded_operations(), 0);
    }

    #[tokio::test]
    async fn outage_mid_run_degrades_without_data_loss() {
        let durable = Arc::new(FlakyStore::default());
        let store = FallbackStore::new(durable.clone());

        store.put("jobs/a", json!({"progress": 10})).await.unwrap();

        durable.go_down();

        // Writes and reads keep succeeding against the memory tier
        store.put("jobs/a", json!({"progress": 50})).await.unwrap();
        store.put("jobs/b", json!({"progress": 0})).await.unwrap();

        assert_eq!(store.get("jobs/a").await.unwrap().unwrap()["progress"], 50);
        assert_eq!(store.get("jobs/b").await.unwrap().unwrap()["progress"], 0);
        assert!(store.degraded_operations() >= 3);

        let rows = store.query("jobs/").await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn memory_only_rows_appear_in_queries_after_recovery() {
        let durable = Arc::new(FlakyStore::default());
        let store = FallbackStore::new(durable.clone());

        durable.go_down();
        store.put("jobs/orphan", json!(1)).await.unwrap();
        durable.down.store(false, Ordering::SeqCst);

        store.put("jobs/direct", json!(2)).await.unwrap();

        let rows = store.query("jobs/").await.unwrap();
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["jobs/direct", "jobs/orphan"]);
    }
}
