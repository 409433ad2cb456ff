//! Target schema for imported stores: the eight mappable fields, their
//! header alias tables, and the price-bucket vocabulary.
//!
//! The alias lists are the de facto file format users' spreadsheets are read
//! against, so the defaults here must stay stable. A YAML file may override
//! them; fields it leaves out keep their defaults.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A column of the target schema that an input header can be mapped onto.
///
/// Variant order is the order the schema mapper claims headers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaField {
    StoreName,
    Website,
    InstagramName,
    Country,
    City,
    Tags,
    Description,
    PriceRange,
}

impl SchemaField {
    pub const ALL: [SchemaField; 8] = [
        SchemaField::StoreName,
        SchemaField::Website,
        SchemaField::InstagramName,
        SchemaField::Country,
        SchemaField::City,
        SchemaField::Tags,
        SchemaField::Description,
        SchemaField::PriceRange,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaField::StoreName => "store_name",
            SchemaField::Website => "website",
            SchemaField::InstagramName => "instagram_name",
            SchemaField::Country => "country",
            SchemaField::City => "city",
            SchemaField::Tags => "tags",
            SchemaField::Description => "description",
            SchemaField::PriceRange => "price_range",
        }
    }
}

impl std::fmt::Display for SchemaField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        SchemaField::ALL
            .into_iter()
            .find(|field| field.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownField(s.to_string()))
    }
}

/// Price bucket a store is filed under. `Unknown` marks a price cell that was
/// filled in but matched no bucket; an empty cell is `None` on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceRange {
    Low,
    Mid,
    High,
    Unknown,
}

impl PriceRange {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PriceRange::Low => "low",
            PriceRange::Mid => "mid",
            PriceRange::High => "high",
            PriceRange::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PriceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub range: PriceRange,
    /// Display label, e.g. `"$$"`. Matched case-insensitively like a synonym.
    pub label: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// Immutable tables and limits the import pipeline runs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub aliases: BTreeMap<SchemaField, Vec<String>>,
    pub price_buckets: Vec<PriceBucket>,
    pub max_tags: usize,
    pub max_name_length: usize,
    pub tag_similarity_threshold: f64,
    pub name_similarity_threshold: f64,
    /// Used when a row yields a name that is empty after cleanup.
    pub placeholder_name: String,
}

const DEFAULT_ALIASES: [(SchemaField, &[&str]); 8] = [
    (
        SchemaField::StoreName,
        &[
            "store_name",
            "name",
            "brand",
            "shop_name",
            "store",
            "title",
            "brand_name",
            "business_name",
        ],
    ),
    (
        SchemaField::Website,
        &[
            "website",
            "url",
            "site",
            "web",
            "homepage",
            "website_url",
            "link",
            "domain",
        ],
    ),
    (
        SchemaField::InstagramName,
        &[
            "instagram_name",
            "instagram",
            "ig",
            "instagram_handle",
            "insta",
            "instagram_url",
            "handle",
        ],
    ),
    (
        SchemaField::Country,
        &["country", "country_name", "nation", "country_code"],
    ),
    (SchemaField::City, &["city", "town", "location", "city_name"]),
    (
        SchemaField::Tags,
        &[
            "tags",
            "categories",
            "category",
            "keywords",
            "labels",
            "style",
            "styles",
        ],
    ),
    (
        SchemaField::Description,
        &["description", "desc", "about", "bio", "summary", "notes"],
    ),
    (
        SchemaField::PriceRange,
        &[
            "price_range",
            "price",
            "pricing",
            "price_point",
            "price_level",
            "price_tier",
        ],
    ),
];

fn default_aliases() -> BTreeMap<SchemaField, Vec<String>> {
    DEFAULT_ALIASES
        .iter()
        .map(|(field, aliases)| (*field, aliases.iter().map(|a| (*a).to_string()).collect()))
        .collect()
}

fn default_price_buckets() -> Vec<PriceBucket> {
    let bucket = |range, label: &str, synonyms: &[&str]| PriceBucket {
        range,
        label: label.to_string(),
        synonyms: synonyms.iter().map(|s| (*s).to_string()).collect(),
    };
    vec![
        bucket(
            PriceRange::Low,
            "$",
            &["budget", "cheap", "affordable", "inexpensive", "low"],
        ),
        bucket(
            PriceRange::Mid,
            "$$",
            &[
                "medium",
                "moderate",
                "mid-range",
                "midrange",
                "mid range",
                "average",
            ],
        ),
        bucket(
            PriceRange::High,
            "$$$",
            &["premium", "luxury", "expensive", "designer", "high-end", "$$$$"],
        ),
    ]
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases(),
            price_buckets: default_price_buckets(),
            max_tags: 20,
            max_name_length: 100,
            tag_similarity_threshold: 0.85,
            name_similarity_threshold: 0.9,
            placeholder_name: "Unnamed Store".to_string(),
        }
    }
}

impl SchemaConfig {
    /// Aliases for `field`, in priority order. Empty when the field has none.
    #[must_use]
    pub fn aliases_for(&self, field: SchemaField) -> &[String] {
        self.aliases.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Parse a YAML override. Fields the document omits keep their defaults,
    /// including individual alias lists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the YAML is malformed or fails validation.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: SchemaConfig = serde_yaml::from_str(content)?;
        for (field, aliases) in default_aliases() {
            config.aliases.entry(field).or_insert(aliases);
        }
        validate_schema(&config)?;
        Ok(config)
    }
}

/// Load and validate a schema override from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_schema_config(path: &Path) -> Result<SchemaConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SchemaFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    SchemaConfig::from_yaml_str(&content)
}

fn is_cleaned_alias(alias: &str) -> bool {
    !alias.is_empty()
        && alias
            .chars()
            .all(|c| c == '_' || (c.is_alphanumeric() && !c.is_uppercase()))
}

fn validate_schema(config: &SchemaConfig) -> Result<(), ConfigError> {
    for field in SchemaField::ALL {
        let aliases = config.aliases_for(field);
        if aliases.is_empty() {
            return Err(ConfigError::Validation(format!(
                "field '{field}' must have at least one alias"
            )));
        }

        let mut seen = HashSet::new();
        for alias in aliases {
            if !is_cleaned_alias(alias) {
                return Err(ConfigError::Validation(format!(
                    "alias '{alias}' for field '{field}' must be lowercase word characters \
                     and underscores"
                )));
            }
            if !seen.insert(alias.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate alias '{alias}' for field '{field}'"
                )));
            }
        }
    }

    if config.max_tags == 0 {
        return Err(ConfigError::Validation(
            "max_tags must be at least 1".to_string(),
        ));
    }
    if config.max_name_length == 0 {
        return Err(ConfigError::Validation(
            "max_name_length must be at least 1".to_string(),
        ));
    }
    for (name, value) in [
        ("tag_similarity_threshold", config.tag_similarity_threshold),
        ("name_similarity_threshold", config.name_similarity_threshold),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "{name} must be in (0, 1], got {value}"
            )));
        }
    }
    if config.placeholder_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "placeholder_name must be non-empty".to_string(),
        ));
    }

    let mut seen_ranges = HashSet::new();
    let mut claimed: HashMap<String, PriceRange> = HashMap::new();
    for bucket in &config.price_buckets {
        if bucket.range == PriceRange::Unknown {
            return Err(ConfigError::Validation(
                "'unknown' is reserved and cannot be configured as a price bucket".to_string(),
            ));
        }
        if !seen_ranges.insert(bucket.range) {
            return Err(ConfigError::Validation(format!(
                "duplicate price bucket '{}'",
                bucket.range
            )));
        }
        for term in std::iter::once(&bucket.label).chain(&bucket.synonyms) {
            let key = term.trim().to_lowercase();
            if key.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "price bucket '{}' has an empty label or synonym",
                    bucket.range
                )));
            }
            if let Some(previous) = claimed.insert(key, bucket.range) {
                if previous != bucket.range {
                    return Err(ConfigError::Validation(format!(
                        "price term '{term}' is claimed by both '{previous}' and '{}'",
                        bucket.range
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
