//! Newest-first history of generated images with quota-aware persistence.
//!
//! [`HistoryCache`] keeps at most [`MAX_HISTORY_ITEMS`] distinct image
//! references and writes the whole sequence as a JSON array under
//! [`HISTORY_STORAGE_KEY`] after every mutation. When the store reports a
//! capacity failure, the oldest entries are dropped one at a time until the
//! write fits. The newest entry is never dropped.
//!
//! Mutations are not internally serialised; callers must not run `add`,
//! `remove`, or `clear` concurrently on the same cache.

use std::sync::Arc;

use lumiere_core::failure::FailureKind;

use crate::store::{KeyValueStore, StoreError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of references kept in history.
pub const MAX_HISTORY_ITEMS: usize = 10;

/// Store key the serialized history lives under.
pub const HISTORY_STORAGE_KEY: &str = "lumiereHistory";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of persisting the history after `add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The full sequence was written.
    Saved,
    /// The sequence was written after dropping its `dropped` oldest entries.
    /// The in-memory history now matches what was written.
    Pruned { dropped: usize },
    /// The newest entry does not fit even on its own. Nothing was written,
    /// the stored history is untouched and the in-memory history is unpruned.
    CapacityExhausted,
    /// A non-capacity store failure aborted the write. The in-memory history
    /// and the store now diverge.
    Failed { reason: String },
}

impl PersistOutcome {
    /// Whether the store now holds the in-memory history.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Saved | Self::Pruned { .. })
    }

    /// Failure category, if the write did not happen.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Saved | Self::Pruned { .. } => None,
            Self::CapacityExhausted => Some(FailureKind::Capacity),
            Self::Failed { .. } => Some(FailureKind::Persistence),
        }
    }

    /// Message to show the user, if any.
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Saved => None,
            Self::Pruned { dropped } => Some(format!("Removed {dropped} old image(s).")),
            Self::CapacityExhausted | Self::Failed { .. } => {
                self.failure_kind().map(|kind| kind.user_message().to_string())
            }
        }
    }
}

/// Errors from [`HistoryCache::remove`].
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// No entry at the requested position.
    #[error("History index {index} is out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The entry was removed in memory but the store write failed.
    #[error("Failed to persist history: {0}")]
    Persistence(#[from] StoreError),

    /// The history could not be serialized.
    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl HistoryError {
    /// Failure category for user reporting.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::IndexOutOfRange { .. } => FailureKind::Validation,
            Self::Persistence(_) | Self::Serialize(_) => FailureKind::Persistence,
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryCache
// ---------------------------------------------------------------------------

/// Bounded, deduplicated, newest-first image history.
pub struct HistoryCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
    items: Vec<String>,
}

impl std::fmt::Debug for HistoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryCache")
            .field("key", &self.key)
            .field("items", &self.items.len())
            .finish()
    }
}

impl HistoryCache {
    /// Load the history stored under [`HISTORY_STORAGE_KEY`].
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        Self::load_with_key(store, HISTORY_STORAGE_KEY).await
    }

    /// Load the history stored under `key`.
    ///
    /// A missing, empty, unreadable, or unparsable value yields an empty
    /// history; the problem is logged, never returned.
    pub async fn load_with_key(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
        let items = match store.get(key).await {
            Ok(Some(raw)) if !raw.trim().is_empty() => {
                match serde_json::from_str::<Vec<String>>(&raw) {
                    Ok(items) => normalize(items),
                    Err(e) => {
                        tracing::warn!(key, error = %e, "Stored history is not a JSON string array, starting empty");
                        Vec::new()
                    }
                }
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to load history, starting empty");
                Vec::new()
            }
        };

        tracing::debug!(key, count = items.len(), "History loaded");

        Self {
            store,
            key: key.to_string(),
            items,
        }
    }

    /// Current entries, newest first.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Entry at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert `reference` at the front and persist.
    ///
    /// A prior occurrence of the same reference is removed first and the
    /// sequence is truncated to [`MAX_HISTORY_ITEMS`] from the tail. On
    /// [`PersistOutcome::Pruned`] the in-memory history shrinks to what was
    /// written.
    pub async fn add(&mut self, reference: impl Into<String>) -> PersistOutcome {
        let reference = reference.into();
        self.items.retain(|existing| *existing != reference);
        self.items.insert(0, reference);
        self.items.truncate(MAX_HISTORY_ITEMS);

        let (written, outcome) = persist_with_pruning(self.store.as_ref(), &self.key, &self.items).await;
        if let PersistOutcome::Pruned { dropped } = outcome {
            tracing::info!(dropped, kept = written.len(), "History pruned to fit storage quota");
            self.items = written;
        }
        outcome
    }

    /// Remove the entry at `index` and persist.
    ///
    /// The entry is removed in memory even if the write fails.
    pub async fn remove(&mut self, index: usize) -> Result<String, HistoryError> {
        if index >= self.items.len() {
            return Err(HistoryError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        let removed = self.items.remove(index);

        let payload = serde_json::to_string(&self.items)?;
        if let Err(e) = self.store.set(&self.key, &payload).await {
            tracing::error!(key = %self.key, error = %e, "Failed to persist history after removal");
            return Err(e.into());
        }
        Ok(removed)
    }

    /// Empty the history and delete the stored value.
    ///
    /// Failing to delete the stored value is logged and otherwise ignored.
    pub async fn clear(&mut self) {
        self.items.clear();
        if let Err(e) = self.store.remove(&self.key).await {
            tracing::warn!(key = %self.key, error = %e, "Failed to clear stored history");
        }
    }
}

/// Keep the first occurrence of each reference and at most
/// [`MAX_HISTORY_ITEMS`] entries.
fn normalize(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len().min(MAX_HISTORY_ITEMS));
    for item in items {
        if out.len() == MAX_HISTORY_ITEMS {
            break;
        }
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Quota-aware persist
// ---------------------------------------------------------------------------

/// Write `items` under `key`, dropping the oldest entries on capacity errors.
///
/// Each capacity failure shrinks the candidate by one, so the loop runs at
/// most `items.len()` times. The first entry is never dropped: when it alone
/// does not fit, nothing is written and the stored value is left as it was
/// ([`PersistOutcome::CapacityExhausted`]). A non-capacity error aborts at
/// once. Returns the sequence the caller should keep in memory together
/// with the outcome.
pub async fn persist_with_pruning(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[String],
) -> (Vec<String>, PersistOutcome) {
    let mut candidate = items.to_vec();
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        let payload = match serde_json::to_string(&candidate) {
            Ok(payload) => payload,
            Err(e) => {
                return (
                    candidate,
                    PersistOutcome::Failed {
                        reason: e.to_string(),
                    },
                )
            }
        };

        match store.set(key, &payload).await {
            Ok(()) => {
                let dropped = items.len() - candidate.len();
                let outcome = if dropped == 0 {
                    PersistOutcome::Saved
                } else {
                    PersistOutcome::Pruned { dropped }
                };
                return (candidate, outcome);
            }
            Err(e) if e.is_capacity() => {
                // The newest entry is never dropped, and an empty history is
                // never written over what is stored.
                if candidate.len() <= 1 {
                    tracing::error!(key, attempts, error = %e, "Newest history entry does not fit in storage");
                    return (items.to_vec(), PersistOutcome::CapacityExhausted);
                }
                candidate.pop();
                tracing::warn!(key, attempts, remaining = candidate.len(), "Storage full, dropping oldest history entry");
            }
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to persist history");
                return (
                    candidate,
                    PersistOutcome::Failed {
                        reason: e.to_string(),
                    },
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
