// Controller error taxonomy and its mapping to failure envelopes
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

use crate::api::messages;
use crate::api::{Envelope, Reply};
use crate::observer::ObserverError;
use crate::store::{StoreError, ValidationErrors};

/// Every way a controller operation can fail
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("No token presented")]
    TokenNotFound,

    #[error("User not found or inactive")]
    UserNotFound,

    #[error("Token validation is not configured")]
    JwtNotConfigured,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Permission denied for {0}")]
    PermissionsDenied(String),

    #[error("Record not found")]
    RecordNotFound,

    #[error("Records not found")]
    RecordsNotFound,

    #[error("Validation failed")]
    ValidationFailed { field_errors: ValidationErrors },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Observer error: {0}")]
    Observer(#[from] ObserverError),

    #[error("Component error: {0}")]
    Component(String),
}

impl ApiError {
    pub fn validation(field_errors: ValidationErrors) -> Self {
        ApiError::ValidationFailed { field_errors }
    }

    /// Untranslated message key sent to clients
    pub fn message_key(&self) -> &'static str {
        match self {
            ApiError::TokenNotFound => messages::TOKEN_NOT_FOUND,
            ApiError::UserNotFound => messages::USER_NOT_FOUND,
            ApiError::JwtNotConfigured => messages::JWT_NOT_FOUND,
            ApiError::AccessDenied(_) => messages::ACCESS_DENIED,
            ApiError::PermissionsDenied(_) => messages::PERMISSIONS_DENIED,
            ApiError::RecordNotFound => messages::RECORD_NOT_FOUND,
            ApiError::RecordsNotFound => messages::RECORDS_NOT_FOUND,
            ApiError::ValidationFailed { .. } => messages::VALIDATION_FAILED,
            ApiError::Observer(ObserverError::ValidationError(_)) => messages::VALIDATION_FAILED,
            ApiError::Observer(ObserverError::SecurityError(_)) => messages::ACCESS_DENIED,
            ApiError::Store(_) | ApiError::Observer(_) | ApiError::Component(_) => messages::INTERNAL_ERROR,
        }
    }

    /// HTTP status code.
    ///
    /// With `legacy` set every auth, permission and not-found failure is 403.
    pub fn status_code(&self, legacy: bool) -> u16 {
        match self {
            ApiError::TokenNotFound | ApiError::UserNotFound => {
                if legacy {
                    403
                } else {
                    401
                }
            }
            ApiError::RecordNotFound | ApiError::RecordsNotFound => {
                if legacy {
                    403
                } else {
                    404
                }
            }
            ApiError::AccessDenied(_) | ApiError::PermissionsDenied(_) => 403,
            ApiError::Observer(ObserverError::SecurityError(_)) => 403,
            ApiError::ValidationFailed { .. } => 422,
            ApiError::Observer(ObserverError::ValidationError(_)) => 422,
            ApiError::JwtNotConfigured => {
                if legacy {
                    403
                } else {
                    500
                }
            }
            ApiError::Store(_) | ApiError::Observer(_) | ApiError::Component(_) => 500,
        }
    }

    fn field_errors(&self) -> Option<Value> {
        match self {
            ApiError::ValidationFailed { field_errors } => Some(json!(field_errors)),
            _ => None,
        }
    }

    /// The one place an error becomes a response
    pub fn to_envelope(&self, legacy: bool) -> Envelope {
        match self {
            ApiError::Store(_) | ApiError::Component(_) | ApiError::JwtNotConfigured => {
                tracing::error!("Operation failed: {}", self);
            }
            ApiError::Observer(_) => tracing::warn!("Operation aborted by observer: {}", self),
            ApiError::PermissionsDenied(_) | ApiError::AccessDenied(_) => {
                tracing::warn!("{}", self)
            }
            _ => tracing::debug!("Operation failed: {}", self),
        }
        Envelope::failure(self.message_key(), self.status_code(legacy), self.field_errors())
    }

    pub fn to_json(&self, legacy: bool) -> Value {
        self.to_envelope(legacy).to_json()
    }
}

impl From<ApiError> for Reply {
    fn from(err: ApiError) -> Self {
        Reply::Envelope(err.to_envelope(crate::config::config().api.legacy_status_codes))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let legacy = crate::config::config().api.legacy_status_codes;
        let status = StatusCode::from_u16(self.status_code(legacy)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json(legacy))).into_response()
    }
}
