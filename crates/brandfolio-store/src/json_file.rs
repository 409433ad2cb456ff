//! A collection kept as one pretty-printed JSON document on disk.

use std::path::{Path, PathBuf};

use brandfolio_core::{Collection, CollectionStore, ImportMode, Store};

use crate::StoreError;

const DEFAULT_COLLECTION_NAME: &str = "My Collection";

/// File-backed [`CollectionStore`].
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Replaces the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the temp file cannot be written or
    /// renamed into place.
    pub async fn save(&self, collection: &Collection) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(collection)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes).await.map_err(write_err)?;
        if let Err(source) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(source));
        }

        tracing::debug!(
            path = %self.path.display(),
            stores = collection.stores.len(),
            "collection saved"
        );
        Ok(())
    }
}

impl CollectionStore for JsonFileStore {
    type Error = StoreError;

    /// A missing file reads as an empty collection.
    async fn load(&self) -> Result<Collection, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
                path: self.path.clone(),
                source,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.path.display(),
                    "no collection file yet, starting empty"
                );
                Ok(Collection::new(DEFAULT_COLLECTION_NAME))
            }
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn write_stores(&self, batch: Vec<Store>, mode: ImportMode) -> Result<(), StoreError> {
        let mut collection = self.load().await?;
        let written = batch.len();
        collection.apply_batch(batch, mode);
        self.save(&collection).await?;
        tracing::info!(
            path = %self.path.display(),
            mode = %mode,
            written,
            total = collection.stores.len(),
            "collection updated"
        );
        Ok(())
    }
}
