//! Persistence backends for [`brandfolio_core::Collection`] documents.

pub mod json_file;
pub mod memory;

use std::path::PathBuf;

use thiserror::Error;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("collection file {path} is not valid JSON: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Encode(#[from] serde_json::Error),

    #[error("write rejected: {0}")]
    Rejected(String),
}
