use brandfolio_core::{ImportMode, SchemaConfig, SchemaField, Store};

use super::*;
use crate::dedup::ResolutionAction;
use crate::table::SourceKind;

fn begin_csv(text: &str, existing: &[Store], mode: ImportMode) -> ImportSession {
    ImportSession::begin(
        text,
        SourceKind::Csv,
        None,
        existing,
        mode,
        &SchemaConfig::default(),
    )
    .unwrap()
}

fn store_with_tags(name: &str, tags: &[&str]) -> Store {
    Store {
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        ..Store::new(name)
    }
}

// -----------------------------------------------------------------------
// phase transitions
// -----------------------------------------------------------------------

#[test]
fn no_collisions_starts_in_tag_review() {
    let session = begin_csv("name\nGanni\nToteme\n", &[], ImportMode::Append);
    assert_eq!(session.phase(), Phase::TagReview);
    assert!(session.current_collision().is_none());
    assert_eq!(session.remaining_collisions(), 0);
}

#[test]
fn collisions_start_in_collision_review() {
    let existing = vec![Store::new("Ganni")];
    let session = begin_csv("name\nGANNI\nToteme\n", &existing, ImportMode::Append);
    assert_eq!(session.phase(), Phase::CollisionReview);
    assert_eq!(session.remaining_collisions(), 1);
    let collision = session.current_collision().unwrap();
    assert_eq!(collision.existing.id, existing[0].id);
    assert_eq!(collision.incoming.store_name, "Ganni");
}

#[test]
fn last_resolution_moves_to_tag_review() {
    let existing = vec![Store::new("Ganni"), Store::new("Toteme")];
    let mut session = begin_csv("name\nganni\ntoteme\n", &existing, ImportMode::Append);
    assert_eq!(session.resolve(ResolutionAction::Skip), Ok(Phase::CollisionReview));
    assert_eq!(session.resolve(ResolutionAction::Skip), Ok(Phase::TagReview));
}

#[test]
fn finalize_during_collision_review_is_rejected() {
    let existing = vec![Store::new("Ganni")];
    let mut session = begin_csv("name\nganni\n", &existing, ImportMode::Append);
    let err = session.finalize(TagDecision::Skip).unwrap_err();
    assert_eq!(
        err,
        SessionError::WrongPhase {
            action: "finish tag review",
            phase: Phase::CollisionReview,
        }
    );
    assert_eq!(session.phase(), Phase::CollisionReview);
    assert_eq!(session.remaining_collisions(), 1);
}

#[test]
fn resolve_during_tag_review_is_rejected() {
    let mut session = begin_csv("name\nGanni\n", &[], ImportMode::Append);
    assert!(matches!(
        session.resolve(ResolutionAction::Merge),
        Err(SessionError::WrongPhase {
            phase: Phase::TagReview,
            ..
        })
    ));
    assert_eq!(session.phase(), Phase::TagReview);
}

#[test]
fn abort_is_terminal() {
    let mut session = begin_csv("name\nGanni\n", &[], ImportMode::Append);
    session.abort().unwrap();
    assert_eq!(session.phase(), Phase::Aborted);
    assert!(session.finalize(TagDecision::Skip).is_err());
    // aborting twice is harmless
    assert!(session.abort().is_ok());
}

#[test]
fn abort_after_finalize_is_rejected() {
    let mut session = begin_csv("name\nGanni\n", &[], ImportMode::Append);
    session.finalize(TagDecision::Skip).unwrap();
    assert!(session.abort().is_err());
    assert_eq!(session.phase(), Phase::Committed);
}

// -----------------------------------------------------------------------
// resolution outcomes
// -----------------------------------------------------------------------

#[test]
fn skip_writes_nothing_for_that_row() {
    let existing = vec![Store::new("Ganni")];
    let mut session = begin_csv("name\nganni\nToteme\n", &existing, ImportMode::Append);
    session.resolve(ResolutionAction::Skip).unwrap();
    let batch = session.finalize(TagDecision::Skip).unwrap();
    assert_eq!(batch.stores.len(), 1);
    assert_eq!(batch.stores[0].store_name, "Toteme");
    assert_eq!(batch.report.duplicates_skipped, 1);
    assert_eq!(batch.report.created, 1);
}

#[test]
fn merge_updates_existing_in_place() {
    let mut ganni = Store::new("Ganni");
    ganni.city = "Copenhagen".to_string();
    let existing = vec![ganni.clone()];
    let mut session = begin_csv(
        "name,website\nGANNI,ganni.com\n",
        &existing,
        ImportMode::Append,
    );
    session.resolve(ResolutionAction::Merge).unwrap();
    let batch = session.finalize(TagDecision::Skip).unwrap();

    assert_eq!(batch.stores.len(), 1);
    let merged = &batch.stores[0];
    assert_eq!(merged.id, ganni.id);
    assert_eq!(merged.city, "Copenhagen");
    assert_eq!(merged.website, "https://ganni.com");
    assert_eq!(batch.report.merged, 1);
    assert_eq!(batch.report.created, 0);
}

#[test]
fn second_collision_sees_first_resolution() {
    let existing = vec![Store::new("Ganni")];
    let mut session = begin_csv(
        "name,website,instagram\nganni,ganni.com,\nGANNI,other.com,ganni\n",
        &existing,
        ImportMode::Append,
    );
    session.resolve(ResolutionAction::Merge).unwrap();

    let second = session.current_collision().unwrap();
    assert_eq!(second.existing.website, "https://ganni.com");

    session.resolve(ResolutionAction::Merge).unwrap();
    let batch = session.finalize(TagDecision::Skip).unwrap();
    assert_eq!(batch.stores.len(), 1);
    assert_eq!(batch.stores[0].website, "https://ganni.com");
    assert_eq!(batch.stores[0].instagram_name, "ganni");
    assert_eq!(batch.report.merged, 2);
}

#[test]
fn duplicate_rows_within_file_collide() {
    let mut session = begin_csv(
        "name,city\nToteme,Stockholm\ntoteme,Oslo\n",
        &[],
        ImportMode::Append,
    );
    assert_eq!(session.remaining_collisions(), 1);
    session.resolve(ResolutionAction::Overwrite).unwrap();
    let batch = session.finalize(TagDecision::Skip).unwrap();
    assert_eq!(batch.stores.len(), 1);
    assert_eq!(batch.stores[0].city, "Oslo");
    assert_eq!(batch.report.created, 1);
    assert_eq!(batch.report.overwritten, 1);
}

#[test]
fn symbol_only_names_do_not_collide() {
    let existing = vec![Store::new("&")];
    let session = begin_csv("name\n!!!\n???\n", &existing, ImportMode::Append);
    assert_eq!(session.phase(), Phase::TagReview);
    assert_eq!(session.remaining_collisions(), 0);
}

#[test]
fn replace_mode_ignores_existing_names() {
    let existing = vec![Store::new("Ganni")];
    let session = begin_csv("name\nGanni\n", &existing, ImportMode::Replace);
    assert_eq!(session.phase(), Phase::TagReview);
    assert_eq!(session.mode(), ImportMode::Replace);
}

#[test]
fn resolve_all_applies_one_action() {
    let existing = vec![Store::new("Ganni"), Store::new("Toteme")];
    let mut session = begin_csv("name\nganni\ntoteme\nSandro\n", &existing, ImportMode::Append);
    assert_eq!(session.resolve_all(ResolutionAction::Skip), Ok(Phase::TagReview));
    let batch = session.finalize(TagDecision::Skip).unwrap();
    assert_eq!(batch.report.duplicates_skipped, 2);
    assert_eq!(batch.stores.len(), 1);
}

// -----------------------------------------------------------------------
// tag review
// -----------------------------------------------------------------------

#[test]
fn tag_groups_cover_written_stores_only() {
    let existing = vec![store_with_tags("Ganni", &["Minimalizt"])];
    let session = begin_csv(
        "name,tags\nToteme,Minimalist|minimalist\n",
        &existing,
        ImportMode::Append,
    );
    // Only the new store is written, and its two spellings are one group.
    assert_eq!(session.tag_groups().len(), 1);
    assert_eq!(session.tag_groups()[0].primary, "Minimalist");
    assert_eq!(session.tag_groups()[0].variants, vec!["minimalist"]);
}

#[test]
fn apply_choices_rewrites_tags() {
    let mut session = begin_csv(
        "name,tags\nToteme,Minimalist|denim\nSandro,minimalist\n",
        &[],
        ImportMode::Append,
    );
    let batch = session
        .finalize(TagDecision::Apply(vec!["minimalist".to_string()]))
        .unwrap();
    assert_eq!(batch.stores[0].tags, vec!["minimalist", "denim"]);
    assert_eq!(batch.stores[1].tags, vec!["minimalist"]);
    assert_eq!(batch.report.tag_groups_merged, 1);
}

#[test]
fn primaries_decision_keeps_first_spelling() {
    let mut session = begin_csv(
        "name,tags\nToteme,Minimalist\nSandro,minimalist\n",
        &[],
        ImportMode::Append,
    );
    let decision = TagDecision::primaries(session.tag_groups());
    let batch = session.finalize(decision).unwrap();
    assert_eq!(batch.stores[1].tags, vec!["Minimalist"]);
}

#[test]
fn wrong_choice_count_is_rejected_and_retryable() {
    let mut session = begin_csv(
        "name,tags\nToteme,Minimalist\nSandro,minimalist\n",
        &[],
        ImportMode::Append,
    );
    assert_eq!(
        session.finalize(TagDecision::Apply(vec![])),
        Err(SessionError::ChoiceCount {
            expected: 1,
            got: 0
        })
    );
    assert_eq!(session.phase(), Phase::TagReview);
    assert_eq!(
        session.finalize(TagDecision::Apply(vec!["denim".to_string()])),
        Err(SessionError::ChoiceNotInGroup {
            group: 0,
            choice: "denim".to_string()
        })
    );
    assert!(session.finalize(TagDecision::Skip).is_ok());
}

// -----------------------------------------------------------------------
// begin
// -----------------------------------------------------------------------

#[test]
fn override_mapping_is_used() {
    let config = SchemaConfig::default();
    let table = crate::parse::parse("label,site\nGanni,ganni.com\n", SourceKind::Csv).unwrap();
    let mut mapping = FieldMapping::default();
    mapping.set(&table, SchemaField::StoreName, "label").unwrap();

    let mut session = ImportSession::begin(
        "label,site\nGanni,ganni.com\n",
        SourceKind::Csv,
        Some(mapping.clone()),
        &[],
        ImportMode::Append,
        &config,
    )
    .unwrap();
    assert_eq!(session.mapping(), &mapping);
    let batch = session.finalize(TagDecision::Skip).unwrap();
    assert_eq!(batch.stores[0].store_name, "Ganni");
    assert!(batch.stores[0].website.is_empty());
}

#[test]
fn report_counts_skipped_rows() {
    let session = begin_csv("name,city\nGanni,\n,Paris\n", &[], ImportMode::Append);
    assert_eq!(session.report().rows_read, 2);
    assert_eq!(session.report().skipped_rows.len(), 1);
}

#[test]
fn invalid_json_fails_before_review() {
    let result = ImportSession::begin(
        "{\"name\": \"Ganni\"}",
        SourceKind::Json,
        None,
        &[],
        ImportMode::Append,
        &SchemaConfig::default(),
    );
    assert!(matches!(result, Err(ImportError::Format(_))));
}
