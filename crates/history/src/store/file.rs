//! JSON-file-backed [`KeyValueStore`] with an optional byte quota.
//!
//! The whole store is one JSON object of string values. Each write reads
//! the file, applies the change, and replaces the file via a sibling temp
//! file and rename, so a crash never leaves a half-written store behind.
//! Reads report a corrupt file; writes replace it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{check_quota, entry_size, KeyValueStore, StoreError};

type Entries = BTreeMap<String, String>;

/// Persistent store backed by a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    quota: Option<usize>,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Store at `path` with an optional byte quota.
    pub fn new(path: impl Into<PathBuf>, quota: Option<usize>) -> Self {
        Self {
            path: path.into(),
            quota,
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(Entries::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Current entries for a read-modify-write cycle.
    ///
    /// An unparsable file is treated as empty so the next write replaces
    /// it; otherwise a corrupt file would block every later save.
    async fn entries_for_write(&self) -> Result<Entries, StoreError> {
        match self.read_entries().await {
            Err(StoreError::Corrupt(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Storage file is corrupt, overwriting");
                Ok(Entries::new())
            }
            other => other,
        }
    }

    async fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.entries_for_write().await?;
        let total: usize = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        let replaced = entries.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
        check_quota(self.quota, total, replaced, entry_size(key, value))?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = match self.read_entries().await {
            Err(StoreError::Corrupt(_)) => return self.write_entries(&Entries::new()).await,
            other => other?,
        };
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(&entries).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn persists_across_instances() -> Result<(), StoreError> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("store.json");

        FileStore::new(&path, None).set("k", "v").await?;
        let reopened = FileStore::new(&path, None);
        assert_eq!(reopened.get("k").await?.as_deref(), Some("v"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() -> Result<(), StoreError> {
        let temp = tempfile::tempdir()?;
        let store = FileStore::new(temp.path().join("absent.json"), None);
        assert_eq!(store.get("k").await?, None);
        store.remove("k").await?;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() -> Result<(), StoreError> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("store.json");
        std::fs::write(&path, "not json")?;
        let store = FileStore::new(&path, None);
        assert_matches!(store.get("k").await, Err(StoreError::Corrupt(_)));
        Ok(())
    }

    #[tokio::test]
    async fn writes_replace_a_corrupt_file() -> Result<(), StoreError> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("store.json");
        std::fs::write(&path, "not json")?;
        let store = FileStore::new(&path, None);

        store.remove("k").await?;
        assert_eq!(store.get("k").await?, None);

        std::fs::write(&path, "not json")?;
        store.set("k", "v").await?;
        assert_eq!(store.get("k").await?.as_deref(), Some("v"));
        Ok(())
    }

    #[tokio::test]
    async fn quota_is_enforced_without_touching_file() -> Result<(), StoreError> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("store.json");
        let store = FileStore::new(&path, Some(6));
        store.set("k", "12345").await?;
        assert!(store.set("k", "123456").await.unwrap_err().is_capacity());
        assert_eq!(store.get("k").await?.as_deref(), Some("12345"));
        Ok(())
    }

    #[tokio::test]
    async fn remove_deletes_only_that_key() -> Result<(), StoreError> {
        let temp = tempfile::tempdir()?;
        let store = FileStore::new(temp.path().join("store.json"), None);
        store.set("a", "1").await?;
        store.set("b", "2").await?;
        store.remove("a").await?;
        assert_eq!(store.get("a").await?, None);
        assert_eq!(store.get("b").await?.as_deref(), Some("2"));
        Ok(())
    }
}
