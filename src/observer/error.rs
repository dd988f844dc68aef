use thiserror::Error;

/// Failures raised by observers; the first one aborts the operation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObserverError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Security error: {0}")]
    SecurityError(String),

    #[error("System error: {0}")]
    SystemError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),
}

impl From<crate::store::StoreError> for ObserverError {
    fn from(error: crate::store::StoreError) -> Self {
        ObserverError::SystemError(error.to_string())
    }
}
