//! Spreadsheet and JSON import for store collections.
//!
//! The pipeline runs parse → map → normalize → detect collisions, then hands
//! an [`ImportSession`] to the caller for review. Nothing here touches
//! storage until [`ImportSession::commit`].

pub mod dedup;
pub mod error;
pub mod mapping;
pub mod normalize;
pub mod parse;
pub mod session;
pub mod table;
pub mod tags;
pub mod text;

pub use dedup::{
    check_single_add, detect_collisions, merge_stores, overwrite_store, resolve_collision,
    AddCheck, Collision, Detection, ResolutionAction,
};
pub use error::{CommitError, ImportError, SessionError};
pub use mapping::{generate_mapping, FieldMapping};
pub use normalize::{normalize, normalize_fields, NormalizedBatch, SkippedRow};
pub use parse::parse;
pub use session::{CommitBatch, ImportReport, ImportSession, Phase, TagDecision};
pub use table::{clean_header, RawTable, SourceKind};
pub use tags::{apply_tag_choices, batch_tags, find_similar_groups, TagMergeGroup};
pub use text::name_key;
