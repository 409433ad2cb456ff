use std::path::PathBuf;

/// Process-level settings for the import front ends.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// JSON document holding the target collection.
    pub collection_path: PathBuf,
    /// Optional YAML override for the alias and price-bucket tables.
    pub schema_path: Option<PathBuf>,
}
