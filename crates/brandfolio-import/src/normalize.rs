//! Row normalization from a [`RawTable`] into [`brandfolio_core::Store`]s.
//!
//! String casing and the dedup key live in [`crate::text`]; this module
//! focuses on resolving mapped cells and the per-field cleanup rules.

use std::collections::HashSet;

use brandfolio_core::{PriceRange, SchemaConfig, SchemaField, Store};
use url::Url;
use uuid::Uuid;

use crate::mapping::FieldMapping;
use crate::table::{Header, RawTable};
use crate::text::{sentence_case, title_case, truncate_chars};

/// A row that could not be turned into a store. Not an error: the rest of
/// the batch still imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based position among the data rows.
    pub row: usize,
    pub reason: String,
}

/// Output of [`normalize`]: usable stores in row order plus the rows dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub stores: Vec<Store>,
    pub skipped: Vec<SkippedRow>,
}

/// Normalizes every data row of `table`.
#[must_use]
pub fn normalize(
    table: &RawTable,
    mapping: &FieldMapping,
    config: &SchemaConfig,
) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for idx in 0..table.rows.len() {
        if let Some(store) = normalize_row(table, idx, mapping, config) {
            batch.stores.push(store);
        } else {
            let skipped = SkippedRow {
                row: idx + 1,
                reason: "row has neither a store name nor a usable website".to_string(),
            };
            tracing::warn!(row = skipped.row, reason = %skipped.reason, "skipping import row");
            batch.skipped.push(skipped);
        }
    }

    tracing::info!(
        stores = batch.stores.len(),
        skipped = batch.skipped.len(),
        "normalized import rows"
    );
    batch
}

/// Normalizes a single data row. Returns `None` when the row has no name
/// and no website to derive one from.
#[must_use]
pub fn normalize_row(
    table: &RawTable,
    row: usize,
    mapping: &FieldMapping,
    config: &SchemaConfig,
) -> Option<Store> {
    let cell = |field: SchemaField| {
        mapping
            .get(field)
            .and_then(|header| table.cell(row, header))
            .map_or("", str::trim)
    };

    let website = normalize_website(cell(SchemaField::Website));
    let raw_name = cell(SchemaField::StoreName);
    let name = if raw_name.is_empty() {
        name_from_website(&website)?
    } else {
        raw_name.to_string()
    };

    let mut store_name = truncate_chars(&title_case(&name), config.max_name_length);
    if store_name.is_empty() {
        store_name.clone_from(&config.placeholder_name);
    }

    Some(Store {
        id: Uuid::new_v4(),
        store_name,
        website,
        instagram_name: normalize_instagram(cell(SchemaField::InstagramName)),
        country: cell(SchemaField::Country).to_string(),
        city: cell(SchemaField::City).to_string(),
        tags: split_tags(cell(SchemaField::Tags), config.max_tags),
        description: sentence_case(cell(SchemaField::Description)),
        price_range: map_price_range(cell(SchemaField::PriceRange), config),
        ..Store::default()
    })
}

/// Normalizes one hand-entered record, given as field/value pairs, with the
/// same rules as an imported row.
#[must_use]
pub fn normalize_fields(fields: &[(SchemaField, &str)], config: &SchemaConfig) -> Option<Store> {
    let table = RawTable {
        headers: fields.iter().map(|(f, _)| Header::new(f.as_str())).collect(),
        rows: vec![fields.iter().map(|(_, v)| (*v).to_string()).collect()],
    };
    let mut mapping = FieldMapping::default();
    for (field, _) in fields {
        mapping.set(&table, *field, field.as_str()).ok()?;
    }
    normalize_row(&table, 0, &mapping, config)
}

/// Derives a display name from a website's host: `https://www.everlane.com/shop`
/// gives `"Everlane"`.
#[must_use]
pub fn name_from_website(website: &str) -> Option<String> {
    let trimmed = website.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let label = host.split('.').next().filter(|l| !l.is_empty())?;
    Some(sentence_case(label))
}

/// Trims and defaults the scheme to `https://` when one is missing.
#[must_use]
pub fn normalize_website(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Reduces `@handle` and `instagram.com/handle/` forms to a bare handle.
#[must_use]
pub fn normalize_instagram(raw: &str) -> String {
    const HOST_MARKER: &str = "instagram.com/";

    let trimmed = raw.trim();
    // ASCII lowercasing keeps byte offsets aligned with `trimmed`.
    let handle = match trimmed.to_ascii_lowercase().find(HOST_MARKER) {
        Some(pos) => trimmed[pos + HOST_MARKER.len()..]
            .split(['/', '?', '#'])
            .next()
            .unwrap_or(""),
        None => trimmed,
    };
    handle
        .trim_start_matches('@')
        .trim_end_matches('/')
        .trim()
        .to_string()
}

/// Splits a tag cell on `|`, `;` or `,`, dropping blanks and repeats, and
/// keeps at most `max_tags` in input order.
#[must_use]
pub fn split_tags(raw: &str, max_tags: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(['|', ';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty() && seen.insert(*t))
        .take(max_tags)
        .map(str::to_string)
        .collect()
}

/// Matches free text against bucket ids, labels and synonyms,
/// case-insensitively. Blank input is `None`; unmatched text is
/// `Some(PriceRange::Unknown)`.
#[must_use]
pub fn map_price_range(raw: &str, config: &SchemaConfig) -> Option<PriceRange> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let matches = |term: &String| term.trim().to_lowercase() == needle;
    let bucket = config.price_buckets.iter().find(|bucket| {
        bucket.range.as_str() == needle
            || matches(&bucket.label)
            || bucket.synonyms.iter().any(matches)
    });
    Some(bucket.map_or(PriceRange::Unknown, |b| b.range))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
