//! Error taxonomy for the validation and persistence layer. Every variant is
//! recoverable from the UI's point of view: it gets shown in the status line
//! and the app keeps running.

use thiserror::Error;

use crate::validate::ValidationErrors;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The candidate record broke one or more input rules.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error("Roll number {0} already exists.")]
    DuplicateKey(String),
    #[error("No student with roll number {0}.")]
    NotFound(String),
    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed student file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("malformed CSV file: {0}")]
    Csv(#[from] csv::Error),
    #[error("import file is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
    #[error("{0}")]
    Unsupported(&'static str),
    #[error("Nothing to undo.")]
    NothingToUndo,
    #[error("Nothing to redo.")]
    NothingToRedo,
}

impl StoreError {
    /// True for failures of the underlying file or database, as opposed to
    /// problems with the request itself.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            StoreError::Storage(_)
                | StoreError::Io(_)
                | StoreError::Format(_)
                | StoreError::Csv(_)
                | StoreError::MissingColumns(_)
                | StoreError::Unsupported(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
