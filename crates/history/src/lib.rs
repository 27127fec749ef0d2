//! Bounded, deduplicated history of generated images.
//!
//! - [`store`] is the quota-aware key-value store adapter
//!   ([`KeyValueStore`]) with in-memory and JSON-file implementations.
//! - [`cache`] is [`HistoryCache`], which owns the newest-first sequence and
//!   the prune-until-it-fits persist algorithm.

pub mod cache;
pub mod store;

pub use cache::{
    persist_with_pruning, HistoryCache, HistoryError, PersistOutcome, HISTORY_STORAGE_KEY,
    MAX_HISTORY_ITEMS,
};
pub use store::file::FileStore;
pub use store::memory::MemoryStore;
pub use store::{KeyValueStore, StoreError};
