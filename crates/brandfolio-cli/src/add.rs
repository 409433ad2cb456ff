//! Hand entry of a single store.

use brandfolio_core::{CollectionStore, ImportMode, SchemaConfig, SchemaField, Store};
use brandfolio_import::{check_single_add, normalize_fields, AddCheck};
use brandfolio_store::JsonFileStore;

#[derive(Debug, Default)]
pub(crate) struct AddFields {
    pub name: String,
    pub website: Option<String>,
    pub instagram: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub tags: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
}

impl AddFields {
    fn pairs(&self) -> Vec<(SchemaField, &str)> {
        let optional = [
            (SchemaField::Website, &self.website),
            (SchemaField::InstagramName, &self.instagram),
            (SchemaField::Country, &self.country),
            (SchemaField::City, &self.city),
            (SchemaField::Tags, &self.tags),
            (SchemaField::Description, &self.description),
            (SchemaField::PriceRange, &self.price),
        ];
        std::iter::once((SchemaField::StoreName, self.name.as_str()))
            .chain(
                optional
                    .into_iter()
                    .filter_map(|(field, value)| value.as_deref().map(|v| (field, v))),
            )
            .collect()
    }
}

/// Normalizes `fields` and checks the result against `existing`.
///
/// Returns the store to add and the names of near-identical stores.
///
/// # Errors
///
/// Fails when the name is blank or another store already has the same name.
pub(crate) fn prepare_add(
    fields: &AddFields,
    existing: &[Store],
    schema: &SchemaConfig,
) -> anyhow::Result<(Store, Vec<String>)> {
    let Some(store) = normalize_fields(&fields.pairs(), schema) else {
        anyhow::bail!("a store needs a name or a website");
    };

    match check_single_add(&store.store_name, existing, schema.name_similarity_threshold) {
        AddCheck::Duplicate(dup) => {
            anyhow::bail!("a store named '{}' already exists", dup.store_name)
        }
        AddCheck::Clear { similar } => {
            let similar = similar.iter().map(|s| s.store_name.clone()).collect();
            Ok((store, similar))
        }
    }
}

/// Adds one store to the collection in `store`.
///
/// # Errors
///
/// Returns an error if the store is rejected by [`prepare_add`] or the
/// collection cannot be read or written.
pub(crate) async fn run_add(
    store: &JsonFileStore,
    schema: &SchemaConfig,
    fields: &AddFields,
) -> anyhow::Result<()> {
    let existing = store.load().await?.stores;
    let (new_store, similar) = prepare_add(fields, &existing, schema)?;

    for name in &similar {
        tracing::warn!(new = %new_store.store_name, existing = %name, "similar store name");
        println!("warning: '{}' looks similar to existing store '{name}'", new_store.store_name);
    }

    let name = new_store.store_name.clone();
    store.write_stores(vec![new_store], ImportMode::Append).await?;
    println!("added '{name}' to {}", store.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> AddFields {
        AddFields {
            name: name.to_string(),
            ..AddFields::default()
        }
    }

    #[test]
    fn exact_duplicate_is_refused() {
        let existing = vec![Store::new("Acne Studios")];
        let err = prepare_add(&fields("acne studios"), &existing, &SchemaConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn near_names_are_reported() {
        let existing = vec![Store::new("Acne Studios")];
        let (store, similar) =
            prepare_add(&fields("Acne Studio"), &existing, &SchemaConfig::default()).unwrap();
        assert_eq!(store.store_name, "Acne Studio");
        assert_eq!(similar, vec!["Acne Studios".to_string()]);
    }

    #[test]
    fn optional_fields_are_normalized() {
        let input = AddFields {
            website: Some("ganni.com".to_string()),
            instagram: Some("@ganni".to_string()),
            tags: Some("danish; playful".to_string()),
            ..fields("ganni")
        };
        let (store, similar) = prepare_add(&input, &[], &SchemaConfig::default()).unwrap();
        assert!(similar.is_empty());
        assert_eq!(store.store_name, "Ganni");
        assert_eq!(store.website, "https://ganni.com");
        assert_eq!(store.instagram_name, "ganni");
        assert_eq!(store.tags, vec!["danish", "playful"]);
    }

    #[test]
    fn blank_name_without_website_is_refused() {
        assert!(prepare_add(&fields("  "), &[], &SchemaConfig::default()).is_err());
    }

    #[tokio::test]
    async fn run_add_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("collection.json"));
        run_add(&store, &SchemaConfig::default(), &fields("Toteme"))
            .await
            .unwrap();
        let collection = store.load().await.unwrap();
        assert_eq!(collection.stores.len(), 1);
        assert_eq!(collection.stores[0].store_name, "Toteme");
    }
}
