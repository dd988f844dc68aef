//! Message keys and the default English catalog.
//!
//! Failure envelopes carry the raw key; success envelopes carry the
//! translated text.

pub const RECORD_CREATED: &str = "record_created";
pub const RECORD_NOT_CREATED: &str = "record_not_created";
pub const RECORD_UPDATED: &str = "record_updated";
pub const RECORD_NOT_UPDATED: &str = "record_not_updated";
pub const RECORD_DELETED: &str = "record_deleted";
pub const RECORD_NOT_DELETED: &str = "record_not_deleted";

pub const TOKEN_NOT_FOUND: &str = "token_not_found";
pub const USER_NOT_FOUND: &str = "user_not_found";
pub const JWT_NOT_FOUND: &str = "jwt_auth_not_found";
pub const ACCESS_DENIED: &str = "access_denied";
pub const PERMISSIONS_DENIED: &str = "insufficient_permissions";
pub const RECORD_NOT_FOUND: &str = "record_not_found";
pub const RECORDS_NOT_FOUND: &str = "records_not_found";
pub const VALIDATION_FAILED: &str = "validation_failed";
pub const INTERNAL_ERROR: &str = "internal_error";
pub const INVALID_REQUEST: &str = "invalid_request";

/// Translate a message key; unknown keys pass through unchanged
pub fn tr(key: &str) -> String {
    let text = match key {
        RECORD_CREATED => "record created",
        RECORD_NOT_CREATED => "record not created",
        RECORD_UPDATED => "record updated",
        RECORD_NOT_UPDATED => "record not updated",
        RECORD_DELETED => "record deleted",
        RECORD_NOT_DELETED => "record not deleted",
        TOKEN_NOT_FOUND => "token not found",
        USER_NOT_FOUND => "user not found",
        JWT_NOT_FOUND => "jwt auth not found",
        ACCESS_DENIED => "access denied",
        PERMISSIONS_DENIED => "insufficient permissions",
        RECORD_NOT_FOUND => "record not found",
        RECORDS_NOT_FOUND => "records not found",
        VALIDATION_FAILED => "validation failed",
        INTERNAL_ERROR => "internal error",
        INVALID_REQUEST => "invalid request",
        other => other,
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_keys() {
        assert_eq!(tr(RECORD_CREATED), "record created");
        assert_eq!(tr("custom_key"), "custom_key");
    }
}
