//! Contract for the document store that owns collections.

use crate::stores::{Collection, ImportMode, Store};

/// Whole-document persistence for a single collection.
///
/// Implementations must make [`CollectionStore::write_stores`] all-or-nothing:
/// a failed write leaves the previously stored document untouched.
#[allow(async_fn_in_trait)]
pub trait CollectionStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the current collection document.
    async fn load(&self) -> Result<Collection, Self::Error>;

    /// Writes a finished import batch in one operation.
    async fn write_stores(&self, batch: Vec<Store>, mode: ImportMode) -> Result<(), Self::Error>;
}
