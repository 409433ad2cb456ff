use thiserror::Error;

use crate::session::Phase;

/// Failures that abort an import attempt before any review starts.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported input format: {0}")]
    Format(String),

    #[error("mapping for {field} names header \"{header}\", which is not in the file")]
    UnknownHeader { field: String, header: String },
}

/// An action that the import session cannot accept in its current phase.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("cannot {action} while the import is in the {phase} phase")]
    WrongPhase { action: &'static str, phase: Phase },

    #[error("expected {expected} tag choices, got {got}")]
    ChoiceCount { expected: usize, got: usize },

    #[error("\"{choice}\" is not a member of tag group {group}")]
    ChoiceNotInGroup { group: usize, choice: String },
}

/// Failure to persist a finished session.
#[derive(Debug, Error)]
pub enum CommitError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to write collection: {0}")]
    Store(#[source] E),
}
