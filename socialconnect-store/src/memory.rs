use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{CollectionStore, Records, Result, StoreError};

/// An in-memory store mirroring the remote store's semantics: generated keys
/// enumerate in creation order, merges are shallow, and an absent collection
/// reads as empty.
///
/// Cloning shares the same state, so tests can keep a handle for inspection
/// after handing one to the system under test.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    collections: Mutex<HashMap<String, Records>>,
    next_key: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a store outage: every operation fails until restored.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Seeds a record under a chosen key, bypassing key generation.
    pub fn insert(&self, collection: &str, key: &str, record: Value) {
        self.inner
            .collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), record);
    }

    fn check_available(&self) -> Result<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }

        Ok(())
    }

    fn generate_key(&self) -> String {
        let count = self.inner.next_key.fetch_add(1, Ordering::SeqCst);

        format!("key{count:06}")
    }

    fn collection(&self, collection: &str) -> Records {
        self.inner
            .collections
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn fetch_all(&self, collection: &str) -> Result<Records> {
        self.check_available()?;

        Ok(self.collection(collection))
    }

    async fn query_equal(&self, collection: &str, field: &str, value: &str) -> Result<Records> {
        self.check_available()?;

        let records = self
            .collection(collection)
            .into_iter()
            .filter(|(_, record)| record.get(field).and_then(Value::as_str) == Some(value))
            .collect();

        Ok(records)
    }

    async fn create(&self, collection: &str, record: Value) -> Result<String> {
        self.check_available()?;

        let key = self.generate_key();
        self.insert(collection, &key, record);

        Ok(key)
    }

    async fn merge(&self, collection: &str, key: &str, partial: Value) -> Result<()> {
        self.check_available()?;

        let mut collections = self.inner.collections.lock();
        let record = collections
            .entry(collection.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Default::default()));

        if let (Value::Object(fields), Value::Object(updates)) = (record, partial) {
            for (field, value) in updates {
                fields.insert(field, value);
            }
        }

        Ok(())
    }
}
