//! `import` and `mapping` command handlers.
//!
//! Parsing and normalization run on the blocking pool; review prompts read
//! stdin; the collection is written once, after the final prompt.

use std::io::{BufRead, Write};
use std::path::Path;

use brandfolio_core::{CollectionStore, ImportMode, SchemaConfig, SchemaField};
use brandfolio_import::{
    generate_mapping, normalize, parse, FieldMapping, ImportError, ImportReport, ImportSession,
    Phase, RawTable, ResolutionAction, SourceKind, TagDecision,
};
use brandfolio_store::JsonFileStore;

use crate::prompt::{CollisionAnswer, Prompter, TagAnswer};
use crate::{DuplicatePolicy, InputFormat, ModeArg, TagPolicy};

#[derive(Debug)]
pub(crate) struct ImportOptions {
    pub format: Option<InputFormat>,
    pub mode: ModeArg,
    pub on_duplicate: DuplicatePolicy,
    pub tags: TagPolicy,
    pub overrides: Vec<(SchemaField, String)>,
    pub dry_run: bool,
}

fn source_kind(path: &Path, format: Option<InputFormat>) -> SourceKind {
    match format {
        Some(InputFormat::Csv) => SourceKind::Csv,
        Some(InputFormat::Json) => SourceKind::Json,
        None => SourceKind::from_extension(path.extension().and_then(std::ffi::OsStr::to_str)),
    }
}

fn import_mode(mode: ModeArg) -> ImportMode {
    match mode {
        ModeArg::Append => ImportMode::Append,
        ModeArg::Replace => ImportMode::Replace,
    }
}

/// Builds the column mapping for `table`: inferred from aliases, then
/// adjusted by any explicit `field=header` overrides.
pub(crate) fn build_mapping(
    table: &RawTable,
    schema: &SchemaConfig,
    overrides: &[(SchemaField, String)],
) -> Result<FieldMapping, ImportError> {
    let mut mapping = generate_mapping(&table.cleaned_headers(), schema);
    for (field, header) in overrides {
        mapping.set(table, *field, header)?;
        tracing::debug!(field = %field, header = %header, "mapping override applied");
    }
    Ok(mapping)
}

/// Renders `mapping` as one line per schema field, using the file's own
/// header spelling.
pub(crate) fn format_mapping(table: &RawTable, mapping: &FieldMapping) -> String {
    let mut out = String::new();
    for field in SchemaField::ALL {
        let source = mapping
            .get(field)
            .map_or("(unmapped)", |cleaned| table.original_header(cleaned).unwrap_or(cleaned));
        out.push_str(&format!("  {:<15} <- {source}\n", field.as_str()));
    }

    let unused: Vec<&str> = table
        .headers
        .iter()
        .filter(|h| !mapping.iter().any(|(_, cleaned)| cleaned == h.cleaned))
        .map(|h| h.original.as_str())
        .collect();
    if !unused.is_empty() {
        out.push_str(&format!("  ignored columns: {}\n", unused.join(", ")));
    }
    out
}

/// Renders the end-of-import summary.
pub(crate) fn format_report(report: &ImportReport) -> String {
    let mut out = format!(
        "rows read: {}\ncreated: {}\nmerged: {}\noverwritten: {}\nskipped as duplicate: {}\n\
         tag groups merged: {}\nrows skipped: {}\n",
        report.rows_read,
        report.created,
        report.merged,
        report.overwritten,
        report.duplicates_skipped,
        report.tag_groups_merged,
        report.skipped_rows.len(),
    );
    for skipped in &report.skipped_rows {
        out.push_str(&format!("  row {}: {}\n", skipped.row, skipped.reason));
    }
    out
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))
}

/// Prints the inferred mapping for a file without importing it.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub(crate) async fn run_mapping_preview(
    schema: &SchemaConfig,
    file: &Path,
    format: Option<InputFormat>,
) -> anyhow::Result<()> {
    let kind = source_kind(file, format);
    let raw = read_input(file).await?;
    let table = tokio::task::spawn_blocking(move || parse(&raw, kind)).await??;
    let mapping = build_mapping(&table, schema, &[])?;
    println!(
        "{} ({kind}, {} rows, {} of {} fields mapped)",
        file.display(),
        table.rows.len(),
        mapping.len(),
        SchemaField::ALL.len()
    );
    print!("{}", format_mapping(&table, &mapping));
    Ok(())
}

/// Outcome of driving a session through review.
#[derive(Debug, PartialEq)]
pub(crate) enum Reviewed {
    Decided(TagDecision),
    Aborted,
}

/// Runs collision and tag review according to the chosen policies,
/// prompting through `prompter` where the policy is `ask`.
///
/// # Errors
///
/// Returns an error if a prompt cannot be read or the session rejects an
/// action.
pub(crate) fn review<R: BufRead, W: Write>(
    session: &mut ImportSession,
    on_duplicate: DuplicatePolicy,
    tags: TagPolicy,
    prompter: &mut Prompter<R, W>,
) -> anyhow::Result<Reviewed> {
    while session.phase() == Phase::CollisionReview {
        let action = match on_duplicate {
            DuplicatePolicy::Merge => ResolutionAction::Merge,
            DuplicatePolicy::Overwrite => ResolutionAction::Overwrite,
            DuplicatePolicy::Skip => ResolutionAction::Skip,
            DuplicatePolicy::Ask => {
                let Some(collision) = session.current_collision() else {
                    break;
                };
                match prompter.ask_collision(&collision, session.remaining_collisions())? {
                    CollisionAnswer::Resolve(action) => {
                        session.resolve(action)?;
                        continue;
                    }
                    CollisionAnswer::ResolveRest(action) => action,
                    CollisionAnswer::Abort => {
                        session.abort()?;
                        return Ok(Reviewed::Aborted);
                    }
                }
            }
        };
        session.resolve_all(action)?;
    }

    let groups = session.tag_groups().to_vec();
    if groups.is_empty() {
        return Ok(Reviewed::Decided(TagDecision::Skip));
    }

    let decision = match tags {
        TagPolicy::Skip => TagDecision::Skip,
        TagPolicy::Primary => TagDecision::primaries(&groups),
        TagPolicy::Ask => {
            let mut choices = Vec::with_capacity(groups.len());
            for (idx, group) in groups.iter().enumerate() {
                match prompter.ask_tag_group(group, idx + 1, groups.len())? {
                    TagAnswer::Use(choice) => choices.push(choice),
                    TagAnswer::SkipAll => return Ok(Reviewed::Decided(TagDecision::Skip)),
                    TagAnswer::Abort => {
                        session.abort()?;
                        return Ok(Reviewed::Aborted);
                    }
                }
            }
            TagDecision::Apply(choices)
        }
    };
    Ok(Reviewed::Decided(decision))
}

/// Imports `file` into the collection held by `store`.
///
/// When `dry_run` is `true` the whole pipeline runs, including review, and
/// the report is printed without writing.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a mapping override
/// names an unknown column, or the final write fails. Aborting is not an
/// error.
pub(crate) async fn run_import(
    store: &JsonFileStore,
    schema: &SchemaConfig,
    file: &Path,
    options: ImportOptions,
) -> anyhow::Result<()> {
    let kind = source_kind(file, options.format);
    let mode = import_mode(options.mode);
    let existing = store.load().await?.stores;

    let raw = read_input(file).await?;

    let blocking_schema = schema.clone();
    let overrides = options.overrides;
    let (mut session, mapping_text) = tokio::task::spawn_blocking(move || {
        let table = parse(&raw, kind)?;
        let mapping = build_mapping(&table, &blocking_schema, &overrides)?;
        let mapping_text = format_mapping(&table, &mapping);
        let batch = normalize(&table, &mapping, &blocking_schema);
        let session =
            ImportSession::from_normalized(batch, mapping, &existing, mode, &blocking_schema);
        Ok::<_, ImportError>((session, mapping_text))
    })
    .await??;

    println!("Importing {} ({kind}, {mode}):", file.display());
    print!("{mapping_text}");

    let mut prompter = Prompter::stdio();
    let decision = match review(&mut session, options.on_duplicate, options.tags, &mut prompter)? {
        Reviewed::Decided(decision) => decision,
        Reviewed::Aborted => {
            println!("import aborted; collection unchanged");
            return Ok(());
        }
    };

    if options.dry_run {
        let batch = session.finalize(decision)?;
        print!("{}", format_report(&batch.report));
        println!(
            "dry-run: would write {} stores to {}",
            batch.stores.len(),
            store.path().display()
        );
        return Ok(());
    }

    let report = session.commit(decision, store).await?;
    print!("{}", format_report(&report));
    println!("saved to {}", store.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use brandfolio_core::Store;

    use super::*;

    fn table(text: &str) -> RawTable {
        parse(text, SourceKind::Csv).unwrap()
    }

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn session(text: &str, existing: &[Store]) -> ImportSession {
        ImportSession::begin(
            text,
            SourceKind::Csv,
            None,
            existing,
            ImportMode::Append,
            &SchemaConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn source_kind_prefers_explicit_format() {
        assert_eq!(source_kind(Path::new("a.json"), None), SourceKind::Json);
        assert_eq!(source_kind(Path::new("a.JSON"), None), SourceKind::Json);
        assert_eq!(source_kind(Path::new("a.txt"), None), SourceKind::Csv);
        assert_eq!(
            source_kind(Path::new("a.csv"), Some(InputFormat::Json)),
            SourceKind::Json
        );
    }

    #[test]
    fn overrides_replace_inferred_columns() {
        let table = table("Shop Name,Brand,Site\nGanni,Other,ganni.com\n");
        let schema = SchemaConfig::default();
        let inferred = build_mapping(&table, &schema, &[]).unwrap();
        assert_eq!(inferred.get(SchemaField::StoreName), Some("shop_name"));

        let adjusted = build_mapping(
            &table,
            &schema,
            &[(SchemaField::StoreName, "Brand".to_string())],
        )
        .unwrap();
        assert_eq!(adjusted.get(SchemaField::StoreName), Some("brand"));
    }

    #[test]
    fn unknown_override_header_is_rejected() {
        let table = table("name\nGanni\n");
        let err = build_mapping(
            &table,
            &SchemaConfig::default(),
            &[(SchemaField::City, "Town".to_string())],
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::UnknownHeader { .. }));
    }

    #[test]
    fn mapping_text_uses_original_headers() {
        let table = table("Shop Name,Favourite Colour\nGanni,green\n");
        let mapping = build_mapping(&table, &SchemaConfig::default(), &[]).unwrap();
        let text = format_mapping(&table, &mapping);
        assert!(text.contains("store_name      <- Shop Name"));
        assert!(text.contains("city            <- (unmapped)"));
        assert!(text.contains("ignored columns: Favourite Colour"));
    }

    #[test]
    fn report_lists_skipped_rows() {
        let report = ImportReport {
            rows_read: 3,
            created: 2,
            skipped_rows: vec![brandfolio_import::SkippedRow {
                row: 3,
                reason: "empty".to_string(),
            }],
            ..ImportReport::default()
        };
        let text = format_report(&report);
        assert!(text.contains("created: 2"));
        assert!(text.contains("row 3: empty"));
    }

    #[test]
    fn policy_review_needs_no_input() {
        let existing = vec![Store::new("Ganni")];
        let mut s = session("name,tags\nganni,Boho\nToteme,Boho|boho\n", &existing);
        let reviewed = review(
            &mut s,
            DuplicatePolicy::Skip,
            TagPolicy::Primary,
            &mut prompter(""),
        )
        .unwrap();
        assert_eq!(
            reviewed,
            Reviewed::Decided(TagDecision::Apply(vec!["Boho".to_string()]))
        );
        assert_eq!(s.report().duplicates_skipped, 1);
    }

    #[test]
    fn interactive_review_mixes_single_and_bulk_answers() {
        let existing = vec![Store::new("Ganni"), Store::new("Toteme"), Store::new("Arket")];
        let mut s = session("name\nganni\ntoteme\narket\n", &existing);
        let reviewed = review(
            &mut s,
            DuplicatePolicy::Ask,
            TagPolicy::Ask,
            &mut prompter("m\nS\n"),
        )
        .unwrap();
        assert_eq!(reviewed, Reviewed::Decided(TagDecision::Skip));
        assert_eq!(s.report().merged, 1);
        assert_eq!(s.report().duplicates_skipped, 2);
    }

    #[test]
    fn abort_answer_aborts_session() {
        let existing = vec![Store::new("Ganni")];
        let mut s = session("name\nganni\n", &existing);
        let reviewed = review(
            &mut s,
            DuplicatePolicy::Ask,
            TagPolicy::Ask,
            &mut prompter("a\n"),
        )
        .unwrap();
        assert_eq!(reviewed, Reviewed::Aborted);
        assert_eq!(s.phase(), Phase::Aborted);
    }
}
