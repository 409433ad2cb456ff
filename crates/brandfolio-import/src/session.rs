//! Interactive import state machine.
//!
//! ```text
//! begin ──► CollisionReview ──► TagReview ──► Committed
//!   │              │                │
//!   └─► (error)    └──── abort ─────┴──► Aborted
//! ```
//!
//! Nothing is written until the session is committed, so aborting from any
//! review phase leaves the stored collection exactly as it was.
//!
//! Collisions are detected once, up front, but each is shown against the
//! current state of the working set: if two incoming rows hit the same
//! store, the second sees the result of resolving the first.

use std::collections::{HashMap, VecDeque};

use brandfolio_core::{CollectionStore, ImportMode, SchemaConfig, Store};

use crate::dedup::{detect_collisions, resolve_collision, Collision, ResolutionAction};
use crate::error::{CommitError, ImportError, SessionError};
use crate::mapping::{generate_mapping, FieldMapping};
use crate::normalize::{normalize, NormalizedBatch, SkippedRow};
use crate::parse::parse;
use crate::table::SourceKind;
use crate::tags::{apply_tag_choices, batch_tags, find_similar_groups, TagMergeGroup};
use crate::text::name_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    CollisionReview,
    TagReview,
    /// The final batch has been handed to storage.
    Committed,
    Aborted,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::CollisionReview => write!(f, "collision review"),
            Phase::TagReview => write!(f, "tag review"),
            Phase::Committed => write!(f, "committed"),
            Phase::Aborted => write!(f, "aborted"),
        }
    }
}

/// The user's answer to the tag review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagDecision {
    /// One canonical tag per group, in group order.
    Apply(Vec<String>),
    /// Keep tags exactly as normalized.
    Skip,
}

impl TagDecision {
    /// Picks each group's primary as its canonical tag.
    #[must_use]
    pub fn primaries(groups: &[TagMergeGroup]) -> Self {
        TagDecision::Apply(groups.iter().map(|g| g.primary.clone()).collect())
    }
}

/// Counts describing what an import did (or would do).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub rows_read: usize,
    pub created: usize,
    pub merged: usize,
    pub overwritten: usize,
    pub duplicates_skipped: usize,
    pub skipped_rows: Vec<SkippedRow>,
    pub tag_groups_merged: usize,
}

/// Everything storage needs for the single write that ends an import.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitBatch {
    pub stores: Vec<Store>,
    pub mode: ImportMode,
    pub report: ImportReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Existing,
    Incoming,
}

#[derive(Debug, Clone)]
struct Entry {
    store: Store,
    origin: Origin,
    /// Needs writing: new, merged, or overwritten.
    dirty: bool,
}

/// One in-flight import against a snapshot of a collection.
#[derive(Debug)]
pub struct ImportSession {
    config: SchemaConfig,
    mode: ImportMode,
    mapping: FieldMapping,
    phase: Phase,
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
    pending: VecDeque<Collision>,
    tag_groups: Vec<TagMergeGroup>,
    report: ImportReport,
}

impl ImportSession {
    /// Parses, maps and normalizes `raw`, then detects collisions against
    /// `existing`.
    ///
    /// `mapping` overrides the inferred column mapping when given. In
    /// [`ImportMode::Replace`] the existing stores are about to be discarded,
    /// so only collisions within the file itself are reported.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] if the input cannot be parsed or `mapping`
    /// names a header the file does not have.
    pub fn begin(
        raw: &str,
        kind: SourceKind,
        mapping: Option<FieldMapping>,
        existing: &[Store],
        mode: ImportMode,
        config: &SchemaConfig,
    ) -> Result<Self, ImportError> {
        let table = parse(raw, kind)?;
        let mapping = match mapping {
            Some(mapping) => {
                mapping.validate(&table)?;
                mapping
            }
            None => generate_mapping(&table.cleaned_headers(), config),
        };
        let batch = normalize(&table, &mapping, config);
        Ok(Self::from_normalized(batch, mapping, existing, mode, config))
    }

    /// Starts review over rows that were already normalized.
    #[must_use]
    pub fn from_normalized(
        batch: NormalizedBatch,
        mapping: FieldMapping,
        existing: &[Store],
        mode: ImportMode,
        config: &SchemaConfig,
    ) -> Self {
        let snapshot: &[Store] = match mode {
            ImportMode::Append => existing,
            ImportMode::Replace => &[],
        };

        let report = ImportReport {
            rows_read: batch.stores.len() + batch.skipped.len(),
            skipped_rows: batch.skipped,
            ..ImportReport::default()
        };
        let detection = detect_collisions(batch.stores, snapshot);

        let mut session = Self {
            config: config.clone(),
            mode,
            mapping,
            phase: Phase::CollisionReview,
            entries: Vec::with_capacity(snapshot.len() + detection.non_conflicting.len()),
            by_key: HashMap::new(),
            pending: detection.collisions.into(),
            tag_groups: Vec::new(),
            report,
        };

        for store in snapshot {
            session.push_entry(store.clone(), Origin::Existing, false);
        }
        for store in detection.non_conflicting {
            session.push_entry(store, Origin::Incoming, true);
        }

        tracing::info!(
            mode = %mode,
            rows = session.report.rows_read,
            collisions = session.pending.len(),
            "import session started"
        );
        if session.pending.is_empty() {
            session.enter_tag_review();
        }
        session
    }

    fn push_entry(&mut self, store: Store, origin: Origin, dirty: bool) {
        let idx = self.entries.len();
        self.by_key.entry(name_key(&store.store_name)).or_insert(idx);
        self.entries.push(Entry {
            store,
            origin,
            dirty,
        });
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn mode(&self) -> ImportMode {
        self.mode
    }

    /// The column mapping the rows were normalized with.
    #[must_use]
    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    #[must_use]
    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    /// Collisions still awaiting a decision, including the current one.
    #[must_use]
    pub fn remaining_collisions(&self) -> usize {
        self.pending.len()
    }

    /// The collision awaiting a decision, with `existing` reflecting every
    /// earlier resolution in this session.
    #[must_use]
    pub fn current_collision(&self) -> Option<Collision> {
        if self.phase != Phase::CollisionReview {
            return None;
        }
        let collision = self.pending.front()?;
        let existing = self
            .by_key
            .get(&collision.key())
            .map_or_else(|| collision.existing.clone(), |&idx| self.entries[idx].store.clone());
        Some(Collision {
            incoming: collision.incoming.clone(),
            existing,
        })
    }

    /// Applies `action` to the current collision and moves on.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] outside collision review.
    pub fn resolve(&mut self, action: ResolutionAction) -> Result<Phase, SessionError> {
        self.expect_phase(Phase::CollisionReview, "resolve a collision")?;
        let Some(collision) = self.pending.pop_front() else {
            self.enter_tag_review();
            return Ok(self.phase);
        };

        let key = collision.key();
        match self.by_key.get(&key).copied() {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                match resolve_collision(
                    &entry.store,
                    &collision.incoming,
                    action,
                    self.config.max_tags,
                ) {
                    Some(resolved) => {
                        entry.store = resolved;
                        entry.dirty = true;
                        if action == ResolutionAction::Merge {
                            self.report.merged += 1;
                        } else {
                            self.report.overwritten += 1;
                        }
                    }
                    None => self.report.duplicates_skipped += 1,
                }
            }
            None => {
                // The owner is always indexed when the collision is queued;
                // fall back to treating the row as new rather than losing it.
                tracing::warn!(key = %key, "collision owner missing from working set");
                self.push_entry(collision.incoming, Origin::Incoming, true);
            }
        }

        tracing::debug!(action = %action, remaining = self.pending.len(), "collision resolved");
        if self.pending.is_empty() {
            self.enter_tag_review();
        }
        Ok(self.phase)
    }

    /// Resolves every remaining collision with the same action.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] outside collision review.
    pub fn resolve_all(&mut self, action: ResolutionAction) -> Result<Phase, SessionError> {
        self.expect_phase(Phase::CollisionReview, "resolve a collision")?;
        while self.phase == Phase::CollisionReview {
            self.resolve(action)?;
        }
        Ok(self.phase)
    }

    /// Similar-tag groups found across the stores this import will write.
    /// Empty until collision review is finished.
    #[must_use]
    pub fn tag_groups(&self) -> &[TagMergeGroup] {
        &self.tag_groups
    }

    fn enter_tag_review(&mut self) {
        let dirty: Vec<Store> = self.dirty_stores().cloned().collect();
        self.tag_groups =
            find_similar_groups(&batch_tags(&dirty), self.config.tag_similarity_threshold);
        self.phase = Phase::TagReview;
        tracing::info!(groups = self.tag_groups.len(), "tag review started");
    }

    fn dirty_stores(&self) -> impl Iterator<Item = &Store> {
        self.entries.iter().filter(|e| e.dirty).map(|e| &e.store)
    }

    /// Applies the tag decision and produces the batch to write.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] outside tag review, or when the choices do
    /// not line up one-to-one with [`Self::tag_groups`]. The session is left
    /// in tag review on a bad choice so it can be retried.
    pub fn finalize(&mut self, decision: TagDecision) -> Result<CommitBatch, SessionError> {
        self.expect_phase(Phase::TagReview, "finish tag review")?;

        if let TagDecision::Apply(choices) = &decision {
            if choices.len() != self.tag_groups.len() {
                return Err(SessionError::ChoiceCount {
                    expected: self.tag_groups.len(),
                    got: choices.len(),
                });
            }
            for (group_idx, (group, choice)) in self.tag_groups.iter().zip(choices).enumerate() {
                if !group.contains(choice) {
                    return Err(SessionError::ChoiceNotInGroup {
                        group: group_idx,
                        choice: choice.clone(),
                    });
                }
            }
        }

        let mut stores: Vec<Store> = self.dirty_stores().cloned().collect();
        if let TagDecision::Apply(choices) = &decision {
            apply_tag_choices(&mut stores, &self.tag_groups, choices);
            self.report.tag_groups_merged = self.tag_groups.len();
        }
        self.report.created = self
            .entries
            .iter()
            .filter(|e| e.dirty && e.origin == Origin::Incoming)
            .count();

        self.phase = Phase::Committed;
        tracing::info!(
            stores = stores.len(),
            created = self.report.created,
            merged = self.report.merged,
            overwritten = self.report.overwritten,
            "import finalized"
        );
        Ok(CommitBatch {
            stores,
            mode: self.mode,
            report: self.report.clone(),
        })
    }

    /// Finalizes and writes the batch to `store` in a single call.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError::Session`] if the decision is rejected (nothing
    /// is written) or [`CommitError::Store`] if the write fails.
    pub async fn commit<S: CollectionStore>(
        mut self,
        decision: TagDecision,
        store: &S,
    ) -> Result<ImportReport, CommitError<S::Error>> {
        let batch = self.finalize(decision)?;
        store
            .write_stores(batch.stores, batch.mode)
            .await
            .map_err(CommitError::Store)?;
        Ok(batch.report)
    }

    /// Cancels the import. No write has happened or will happen.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] once the session is committed.
    pub fn abort(&mut self) -> Result<(), SessionError> {
        if self.phase == Phase::Committed {
            return Err(SessionError::WrongPhase {
                action: "abort",
                phase: self.phase,
            });
        }
        if self.phase != Phase::Aborted {
            tracing::info!(
                phase = %self.phase,
                unresolved = self.pending.len(),
                "import aborted"
            );
        }
        self.phase = Phase::Aborted;
        Ok(())
    }

    fn expect_phase(&self, wanted: Phase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == wanted {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
