pub mod app_config;
pub mod config;
pub mod schema;
pub mod storage;
pub mod stores;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use schema::{load_schema_config, PriceBucket, PriceRange, SchemaConfig, SchemaField};
pub use storage::CollectionStore;
pub use stores::{Collection, ImportMode, Store};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read schema file {path}: {source}")]
    SchemaFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema file: {0}")]
    SchemaFileParse(#[from] serde_yaml::Error),

    #[error("schema validation failed: {0}")]
    Validation(String),

    #[error("unknown schema field '{0}'")]
    UnknownField(String),
}
