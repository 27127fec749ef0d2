//! In-process [`KeyValueStore`] with an optional byte quota.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{check_quota, entry_size, KeyValueStore, StoreError};

/// Volatile store, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once `quota` bytes would be exceeded.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Bytes currently held.
    pub async fn used_bytes(&self) -> usize {
        self.entries
            .read()
            .await
            .iter()
            .map(|(k, v)| entry_size(k, v))
            .sum()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let total: usize = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        let replaced = entries.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
        check_quota(self.quota, total, replaced, entry_size(key, value))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.remove("k").await.unwrap();
    }

    #[tokio::test]
    async fn quota_rejects_oversized_write_and_keeps_old_value() {
        let store = MemoryStore::with_quota(8);
        store.set("k", "1234").await.unwrap();
        assert_matches!(
            store.set("k", "12345678").await,
            Err(StoreError::Capacity { .. })
        );
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("1234"));
        assert_eq!(store.used_bytes().await, 5);
    }

    #[tokio::test]
    async fn quota_counts_other_keys() {
        let store = MemoryStore::with_quota(10);
        store.set("a", "1234").await.unwrap();
        assert!(store.set("b", "1234").await.is_ok());
        assert!(store.set("c", "1").await.unwrap_err().is_capacity());
    }
}
