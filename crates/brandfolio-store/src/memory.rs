//! In-process store for dry runs and tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use brandfolio_core::{Collection, CollectionStore, ImportMode, Store};
use tokio::sync::Mutex;

use crate::StoreError;

/// [`CollectionStore`] held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    collection: Mutex<Collection>,
    writes: AtomicUsize,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new(collection: Collection) -> Self {
        Self {
            collection: Mutex::new(collection),
            writes: AtomicUsize::new(0),
            reject_writes: AtomicBool::new(false),
        }
    }

    /// Copy of the current document.
    pub async fn snapshot(&self) -> Collection {
        self.collection.lock().await.clone()
    }

    /// Number of successful [`CollectionStore::write_stores`] calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every later write fail without changing the document.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Collection::new("In-memory"))
    }
}

impl CollectionStore for MemoryStore {
    type Error = StoreError;

    async fn load(&self) -> Result<Collection, StoreError> {
        Ok(self.snapshot().await)
    }

    async fn write_stores(&self, batch: Vec<Store>, mode: ImportMode) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("memory store is read-only".to_string()));
        }
        self.collection.lock().await.apply_batch(batch, mode);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
