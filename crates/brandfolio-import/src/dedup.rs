//! Duplicate detection by [`name_key`] and the three ways a collision can
//! be resolved.

use std::collections::HashMap;

use brandfolio_core::Store;

use crate::text::{name_key, similarity};

/// What to do with an incoming store whose name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionAction {
    /// Keep the existing store and fill its gaps from the incoming one.
    Merge,
    /// Replace every field the incoming store provides.
    Overwrite,
    /// Drop the incoming store.
    Skip,
}

impl std::fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionAction::Merge => write!(f, "merge"),
            ResolutionAction::Overwrite => write!(f, "overwrite"),
            ResolutionAction::Skip => write!(f, "skip"),
        }
    }
}

/// An incoming store paired with the store that already owns its name key.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub incoming: Store,
    pub existing: Store,
}

impl Collision {
    #[must_use]
    pub fn key(&self) -> String {
        name_key(&self.incoming.store_name)
    }
}

/// Result of [`detect_collisions`]. Both lists keep input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub collisions: Vec<Collision>,
    pub non_conflicting: Vec<Store>,
}

/// Splits `incoming` into stores that need a decision and stores that can
/// be added as-is.
///
/// A store collides when its name key matches an existing store or an
/// earlier non-conflicting store from the same batch. For existing matches
/// the first store in `existing` with that key is reported.
#[must_use]
pub fn detect_collisions(incoming: Vec<Store>, existing: &[Store]) -> Detection {
    let mut owners: HashMap<String, Store> = HashMap::new();
    for store in existing {
        owners
            .entry(name_key(&store.store_name))
            .or_insert_with(|| store.clone());
    }

    let mut detection = Detection::default();
    for store in incoming {
        let key = name_key(&store.store_name);
        if let Some(owner) = owners.get(&key) {
            tracing::debug!(
                incoming = %store.store_name,
                existing = %owner.store_name,
                "name collision"
            );
            detection.collisions.push(Collision {
                existing: owner.clone(),
                incoming: store,
            });
        } else {
            owners.insert(key, store.clone());
            detection.non_conflicting.push(store);
        }
    }
    detection
}

/// Applies `action` to a collision. `None` means the incoming store is
/// discarded and nothing needs writing.
#[must_use]
pub fn resolve_collision(
    existing: &Store,
    incoming: &Store,
    action: ResolutionAction,
    max_tags: usize,
) -> Option<Store> {
    match action {
        ResolutionAction::Merge => Some(merge_stores(existing, incoming, max_tags)),
        ResolutionAction::Overwrite => Some(overwrite_store(existing, incoming)),
        ResolutionAction::Skip => None,
    }
}

/// Non-destructive merge: tags are unioned (existing first, capped at
/// `max_tags`); website, Instagram and price are taken from `incoming` only
/// where `existing` has none. Every other field of `existing` is kept.
#[must_use]
pub fn merge_stores(existing: &Store, incoming: &Store, max_tags: usize) -> Store {
    let mut merged = existing.clone();

    for tag in &incoming.tags {
        if !merged.has_tag(tag) {
            merged.tags.push(tag.clone());
        }
    }
    merged.tags.truncate(max_tags.max(existing.tags.len()));

    if merged.website.is_empty() {
        merged.website.clone_from(&incoming.website);
    }
    if merged.instagram_name.is_empty() {
        merged.instagram_name.clone_from(&incoming.instagram_name);
    }
    if merged.price_range.is_none() {
        merged.price_range = incoming.price_range;
    }
    merged
}

/// Takes every non-empty field of `incoming`, including the name. The id of
/// `existing` is kept so the write replaces it in place.
#[must_use]
pub fn overwrite_store(existing: &Store, incoming: &Store) -> Store {
    let pick = |new: &String, old: &String| {
        if new.is_empty() {
            old.clone()
        } else {
            new.clone()
        }
    };

    Store {
        id: existing.id,
        store_name: pick(&incoming.store_name, &existing.store_name),
        website: pick(&incoming.website, &existing.website),
        instagram_name: pick(&incoming.instagram_name, &existing.instagram_name),
        country: pick(&incoming.country, &existing.country),
        city: pick(&incoming.city, &existing.city),
        tags: if incoming.tags.is_empty() {
            existing.tags.clone()
        } else {
            incoming.tags.clone()
        },
        description: pick(&incoming.description, &existing.description),
        price_range: incoming.price_range.or(existing.price_range),
        rating: if incoming.rating > 0.0 {
            incoming.rating
        } else {
            existing.rating
        },
        sustainability: pick(&incoming.sustainability, &existing.sustainability),
        image_url: pick(&incoming.image_url, &existing.image_url),
    }
}

/// Outcome of checking a single store before it is added by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum AddCheck<'a> {
    /// Same name key as an existing store; the add should be refused.
    Duplicate(&'a Store),
    /// No exact collision. `similar` lists stores with near-identical names.
    Clear { similar: Vec<&'a Store> },
}

/// Checks a hand-entered name against `existing`.
#[must_use]
pub fn check_single_add<'a>(name: &str, existing: &'a [Store], threshold: f64) -> AddCheck<'a> {
    let key = name_key(name);
    if let Some(dup) = existing.iter().find(|s| name_key(&s.store_name) == key) {
        return AddCheck::Duplicate(dup);
    }

    let similar = existing
        .iter()
        .filter(|s| similarity(&name_key(&s.store_name), &key) >= threshold)
        .collect();
    AddCheck::Clear { similar }
}
