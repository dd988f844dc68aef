use thiserror::Error;

/// Failures reported by storage collaborators (entity, file and user stores)
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("Unknown relation: {0}")]
    UnknownRelation(String),

    #[error("Entity has not been saved yet")]
    Unsaved,

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<crate::filter::error::FilterError> for StoreError {
    fn from(err: crate::filter::error::FilterError) -> Self {
        StoreError::Query(err.to_string())
    }
}
