//! Seen-set: ids of posts that were already relayed.
//!
//! Append-only. An id is written once, right after its dispatch, and never
//! removed. Backends only need a single unique string key.

pub mod sqlite;

use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::RelayError;

pub use sqlite::SqliteSeenStore;

#[async_trait::async_trait]
pub trait SeenStore: Send + Sync {
    /// `Err(StoreUnavailable)` when the backend is not reachable.
    async fn has(&self, id: &str) -> Result<bool, RelayError>;

    /// Records `id`. Recording an id twice is not an error.
    async fn mark_seen(&self, id: &str) -> Result<(), RelayError>;
}

/// Process-local seen-set, lost on restart.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    inner: Mutex<HashSet<String>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded store, handy for tests and dry runs.
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Mutex::new(ids.into_iter().map(Into::into).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("seen set mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl SeenStore for MemorySeenStore {
    async fn has(&self, id: &str) -> Result<bool, RelayError> {
        Ok(self
            .inner
            .lock()
            .expect("seen set mutex poisoned")
            .contains(id))
    }

    async fn mark_seen(&self, id: &str) -> Result<(), RelayError> {
        self.inner
            .lock()
            .expect("seen set mutex poisoned")
            .insert(id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_marks_once() {
        let s = MemorySeenStore::new();
        assert!(!s.has("a").await.unwrap());
        s.mark_seen("a").await.unwrap();
        s.mark_seen("a").await.unwrap();
        assert!(s.has("a").await.unwrap());
        assert_eq!(s.len(), 1);
    }

    #[tokio::test]
    async fn seeded_ids_are_seen() {
        let s = MemorySeenStore::with_ids(["x", "y"]);
        assert!(s.has("y").await.unwrap());
        assert!(!s.has("z").await.unwrap());
    }
}
