//! Read-only audit of tag spellings across the stored collection.

use std::collections::HashMap;

use brandfolio_core::{Collection, CollectionStore, SchemaConfig};
use brandfolio_import::{find_similar_groups, TagMergeGroup};
use brandfolio_store::JsonFileStore;

/// Similar-tag groups across every store, each member paired with the
/// number of stores using it.
pub(crate) fn audit(collection: &Collection, threshold: f64) -> Vec<Vec<(String, usize)>> {
    let mut usage: HashMap<&str, usize> = HashMap::new();
    for tag in collection.stores.iter().flat_map(|s| s.tags.iter()) {
        *usage.entry(tag.as_str()).or_default() += 1;
    }

    find_similar_groups(&collection.distinct_tags(), threshold)
        .iter()
        .map(|group: &TagMergeGroup| {
            group
                .members()
                .map(|m| (m.to_string(), usage.get(m).copied().unwrap_or(0)))
                .collect()
        })
        .collect()
}

/// Prints similar-tag groups for the collection in `store`.
///
/// # Errors
///
/// Returns an error if the threshold is outside `(0, 1]` or the collection
/// cannot be loaded.
pub(crate) async fn run_tags(
    store: &JsonFileStore,
    schema: &SchemaConfig,
    threshold: Option<f64>,
) -> anyhow::Result<()> {
    let threshold = threshold.unwrap_or(schema.tag_similarity_threshold);
    if !(threshold > 0.0 && threshold <= 1.0) {
        anyhow::bail!("threshold must be in (0, 1], got {threshold}");
    }

    let collection = store.load().await?;
    let groups = audit(&collection, threshold);
    if groups.is_empty() {
        println!(
            "no similar tags among {} distinct tags",
            collection.distinct_tags().len()
        );
        return Ok(());
    }

    println!("{} groups of similar tags:", groups.len());
    for group in &groups {
        let members: Vec<String> = group
            .iter()
            .map(|(tag, count)| format!("{tag} ({count})"))
            .collect();
        println!("  {}", members.join(", "));
    }
    Ok(())
}
