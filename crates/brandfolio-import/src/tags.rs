//! Near-duplicate tag grouping.
//!
//! Clustering is a single greedy pass in input order, so different orders
//! can produce different groups. Groups are suggestions for a person to
//! confirm, never merged automatically.

use std::collections::{HashMap, HashSet};

use brandfolio_core::Store;

use crate::text::similarity;

/// Tags judged to be spellings of the same label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMergeGroup {
    pub primary: String,
    pub variants: Vec<String>,
}

impl TagMergeGroup {
    /// `primary` followed by the variants.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.variants.iter().map(String::as_str))
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.members().any(|m| m == tag)
    }
}

/// Every distinct tag across `stores`, in order of first appearance.
#[must_use]
pub fn batch_tags(stores: &[Store]) -> Vec<String> {
    let mut seen = HashSet::new();
    stores
        .iter()
        .flat_map(|s| s.tags.iter())
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// Groups tags whose [`similarity`] to a group's primary is at least
/// `threshold`.
///
/// Walks `tags` once: each tag not yet claimed becomes a primary and claims
/// every later unclaimed tag close enough to it. Primaries that claim
/// nothing are not reported.
#[must_use]
pub fn find_similar_groups(tags: &[String], threshold: f64) -> Vec<TagMergeGroup> {
    let mut seen = HashSet::new();
    let unique: Vec<&String> = tags.iter().filter(|t| seen.insert(t.as_str())).collect();

    let mut claimed = vec![false; unique.len()];
    let mut groups = Vec::new();

    for i in 0..unique.len() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let primary = unique[i];

        let mut variants = Vec::new();
        for j in (i + 1)..unique.len() {
            if !claimed[j] && similarity(primary, unique[j]) >= threshold {
                claimed[j] = true;
                variants.push(unique[j].clone());
            }
        }

        if !variants.is_empty() {
            groups.push(TagMergeGroup {
                primary: primary.clone(),
                variants,
            });
        }
    }

    groups
}

/// Rewrites every member of each group to its chosen canonical tag across
/// `stores`, collapsing any duplicates this creates within a store.
///
/// `choices[i]` is the canonical label for `groups[i]`; callers validate that
/// it is a member of that group.
pub fn apply_tag_choices(stores: &mut [Store], groups: &[TagMergeGroup], choices: &[String]) {
    let mut canonical: HashMap<&str, &str> = HashMap::new();
    for (group, choice) in groups.iter().zip(choices) {
        for member in group.members() {
            canonical.insert(member, choice.as_str());
        }
    }

    for store in stores.iter_mut() {
        let mut seen = HashSet::new();
        let rewritten: Vec<String> = store
            .tags
            .iter()
            .map(|tag| canonical.get(tag.as_str()).copied().unwrap_or(tag.as_str()))
            .filter(|tag| seen.insert(*tag))
            .map(str::to_string)
            .collect();
        store.tags = rewritten;
    }
}
