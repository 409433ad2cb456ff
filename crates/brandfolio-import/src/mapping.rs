//! Header → schema field assignment.
//!
//! Matching is exact on cleaned headers only. Substring or fuzzy matching
//! would map columns like `store_notes` onto `store_name`, so recall is
//! traded for precision and unmatched fields are simply left unmapped.

use std::collections::{BTreeMap, HashSet};

use brandfolio_core::{SchemaConfig, SchemaField};

use crate::error::ImportError;
use crate::table::{clean_header, RawTable};

/// Which cleaned header feeds each schema field. Unmapped fields are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    entries: BTreeMap<SchemaField, String>,
}

impl FieldMapping {
    #[must_use]
    pub fn get(&self, field: SchemaField) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SchemaField, &str)> {
        self.entries.iter().map(|(f, h)| (*f, h.as_str()))
    }

    /// Points `field` at `header`, releasing any other field that used it.
    ///
    /// `header` may be given in its original or cleaned spelling.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::UnknownHeader`] if no column of `table` matches.
    pub fn set(
        &mut self,
        table: &RawTable,
        field: SchemaField,
        header: &str,
    ) -> Result<(), ImportError> {
        let idx = table
            .header_index(header)
            .or_else(|| table.header_index(&clean_header(header)))
            .ok_or_else(|| ImportError::UnknownHeader {
                field: field.to_string(),
                header: header.to_string(),
            })?;
        let cleaned = table.headers[idx].cleaned.clone();
        self.entries.retain(|f, h| *f == field || *h != cleaned);
        self.entries.insert(field, cleaned);
        Ok(())
    }

    /// Leaves `field` unmapped.
    pub fn clear(&mut self, field: SchemaField) {
        self.entries.remove(&field);
    }

    /// Checks that every mapped header exists in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::UnknownHeader`] for the first dangling entry.
    pub fn validate(&self, table: &RawTable) -> Result<(), ImportError> {
        for (field, header) in &self.entries {
            if !table.headers.iter().any(|h| h.cleaned == *header) {
                return Err(ImportError::UnknownHeader {
                    field: field.to_string(),
                    header: header.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Infers a mapping from cleaned headers.
///
/// Fields claim headers in [`SchemaField::ALL`] order; each takes the first
/// header, in column order, that equals one of its aliases and that no earlier
/// field has claimed.
#[must_use]
pub fn generate_mapping(headers: &[String], config: &SchemaConfig) -> FieldMapping {
    let mut consumed: HashSet<usize> = HashSet::new();
    let mut entries = BTreeMap::new();

    for field in SchemaField::ALL {
        let aliases = config.aliases_for(field);
        let hit = headers
            .iter()
            .enumerate()
            .find(|(idx, header)| !consumed.contains(idx) && aliases.iter().any(|a| a == *header));
        if let Some((idx, header)) = hit {
            tracing::debug!(field = %field, header = %header, "mapped column");
            consumed.insert(idx);
            entries.insert(field, header.clone());
        }
    }

    FieldMapping { entries }
}
