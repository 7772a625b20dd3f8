use thiserror::Error;

use crate::api::ApiError;

/// Why a dataset was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Dataset must be an array")]
    NotAnArray,

    #[error("Element {index} is not an object")]
    NotAnObject { index: usize },

    #[error("Missing required field \"{field}\" in element {index}")]
    MissingField { field: &'static str, index: usize },

    #[error("Duplicate id {id} for element {name}")]
    DuplicateId { id: String, name: String },

    #[error("Malformed dataset: {0}")]
    Malformed(String),
}

/// Failures reported to listeners through `dataError` and `syncError`.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SyncError {
    /// True for fetch failures likely to clear up on the next sync.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Fetch(e) => e.is_transient(),
            SyncError::Validation(_) => false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to serialize dataset: {0}")]
    Serialize(String),
}
