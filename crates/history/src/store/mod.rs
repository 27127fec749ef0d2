//! Size-limited, string-keyed persistent store.
//!
//! Writes may fail with [`StoreError::Capacity`] when the store's byte
//! quota would be exceeded; every other failure is a plain persistence
//! error. Both implementations count a stored entry as
//! `key.len() + value.len()` bytes against the quota.

pub mod file;
pub mod memory;

use async_trait::async_trait;

/// Errors from a [`KeyValueStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The write would exceed the store's size quota.
    #[error("Storage quota exceeded: write needs {needed} bytes, quota is {quota}")]
    Capacity {
        /// Total bytes the store would hold after the write.
        needed: usize,
        /// Configured quota in bytes.
        quota: usize,
    },

    /// Filesystem failure in a file-backed store.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but is not a JSON object of strings.
    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Any other store-specific failure.
    #[error("Storage error: {0}")]
    Other(String),
}

impl StoreError {
    /// Whether this failure is a quota failure (and therefore prunable).
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity { .. })
    }
}

/// Async key-value persistence collaborator.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Bytes an entry occupies against a store quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Reject a write when the resulting total would exceed `quota`.
///
/// `current_total` is the store size before the write and `replaced` the
/// size of the entry being overwritten (0 if new).
pub(crate) fn check_quota(
    quota: Option<usize>,
    current_total: usize,
    replaced: usize,
    incoming: usize,
) -> Result<(), StoreError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let needed = current_total.saturating_sub(replaced) + incoming;
    if needed > quota {
        return Err(StoreError::Capacity { needed, quota });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn quota_unbounded_when_none() {
        assert!(check_quota(None, usize::MAX - 1, 0, 1).is_ok());
    }

    #[test]
    fn quota_accounts_for_replaced_entry() {
        assert!(check_quota(Some(10), 10, 6, 6).is_ok());
        assert_matches!(
            check_quota(Some(10), 10, 6, 7),
            Err(StoreError::Capacity { needed: 11, quota: 10 })
        );
    }

    #[test]
    fn capacity_is_detected() {
        assert!(StoreError::Capacity { needed: 2, quota: 1 }.is_capacity());
        assert!(!StoreError::Other("boom".into()).is_capacity());
    }
}
