use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::PriceRange;

/// A brand/store as it lives inside a [`Collection`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub id: Uuid,
    pub store_name: String,
    /// Absolute URL, or empty.
    pub website: String,
    /// Bare Instagram handle without `@`, or empty.
    pub instagram_name: String,
    pub country: String,
    pub city: String,
    /// Display order is preserved; membership is treated as a set.
    pub tags: Vec<String>,
    pub description: String,
    /// `None` when no price information was supplied.
    pub price_range: Option<PriceRange>,
    pub rating: f32,
    pub sustainability: String,
    pub image_url: String,
}

impl Store {
    /// Creates an otherwise empty store with a freshly generated id.
    #[must_use]
    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            store_name: store_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// How a finished import batch is written into its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Upsert by id: matching ids are replaced, new ids are appended.
    Append,
    /// The batch becomes the collection's entire store list.
    Replace,
}

impl std::fmt::Display for ImportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportMode::Append => write!(f, "append"),
            ImportMode::Replace => write!(f, "replace"),
        }
    }
}

/// A user's named grouping of stores. Persisted as a whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub stores: Vec<Store>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Collection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            stores: Vec::new(),
            updated_at: None,
        }
    }

    /// Folds a finished import batch into the store list.
    pub fn apply_batch(&mut self, batch: Vec<Store>, mode: ImportMode) {
        match mode {
            ImportMode::Replace => self.stores = batch,
            ImportMode::Append => {
                for store in batch {
                    if let Some(slot) = self.stores.iter_mut().find(|s| s.id == store.id) {
                        *slot = store;
                    } else {
                        self.stores.push(store);
                    }
                }
            }
        }
        self.updated_at = Some(Utc::now());
    }

    /// Every distinct tag in the collection, in order of first appearance.
    #[must_use]
    pub fn distinct_tags(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.stores
            .iter()
            .flat_map(|s| s.tags.iter())
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str, tags: &[&str]) -> Store {
        Store {
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            ..Store::new(name)
        }
    }

    #[test]
    fn new_store_gets_unique_ids() {
        assert_ne!(Store::new("A").id, Store::new("A").id);
    }

    #[test]
    fn apply_batch_append_upserts_by_id() {
        let mut collection = Collection::new("Favourites");
        let existing = store("Ganni", &["danish"]);
        collection.stores.push(existing.clone());

        let mut updated = existing.clone();
        updated.city = "Copenhagen".to_string();
        let fresh = store("Everlane", &[]);

        collection.apply_batch(vec![updated, fresh.clone()], ImportMode::Append);

        assert_eq!(collection.stores.len(), 2);
        assert_eq!(collection.stores[0].id, existing.id);
        assert_eq!(collection.stores[0].city, "Copenhagen");
        assert_eq!(collection.stores[1].id, fresh.id);
        assert!(collection.updated_at.is_some());
    }

    #[test]
    fn apply_batch_replace_discards_previous_stores() {
        let mut collection = Collection::new("Favourites");
        collection.stores.push(store("Ganni", &[]));
        let fresh = store("Everlane", &[]);

        collection.apply_batch(vec![fresh.clone()], ImportMode::Replace);

        assert_eq!(collection.stores, vec![fresh]);
    }

    #[test]
    fn distinct_tags_preserves_first_appearance() {
        let mut collection = Collection::new("Favourites");
        collection.stores.push(store("A", &["Denim", "Basics"]));
        collection.stores.push(store("B", &["Basics", "Linen"]));
        assert_eq!(collection.distinct_tags(), vec!["Denim", "Basics", "Linen"]);
    }

    #[test]
    fn store_deserializes_with_missing_display_fields() {
        let json = r#"{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8","store_name":"Ganni"}"#;
        let parsed: Store = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.store_name, "Ganni");
        assert!(parsed.tags.is_empty());
        assert!(parsed.price_range.is_none());
        assert!(parsed.rating.abs() < f32::EPSILON);
    }

    #[test]
    fn import_mode_display() {
        assert_eq!(ImportMode::Append.to_string(), "append");
        assert_eq!(ImportMode::Replace.to_string(), "replace");
    }
}
