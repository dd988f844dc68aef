use serde_json::json;

use super::services::Services;
use crate::api::{Envelope, Reply};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::request::ResourceRequest;

/// Resolve the request's user into `user` (memoized)
pub async fn authenticate(user: &mut CurrentUser, request: &ResourceRequest, services: &Services) -> Result<(), ApiError> {
    user.resolve(request.token.as_deref(), services.tokens.as_deref(), services.users.as_ref())
        .await?;
    Ok(())
}

/// `{ group: [...] }` for the authenticated user
pub async fn check(user: &mut CurrentUser, request: &ResourceRequest, services: &Services) -> Reply {
    match authenticate(user, request, services).await {
        Ok(()) => {
            let groups = user.get().map(|u| u.groups.clone()).unwrap_or_default();
            Envelope::success(json!({ "group": groups })).into()
        }
        Err(err) => Reply::Envelope(err.to_envelope(services.legacy_status_codes())),
    }
}

pub fn csrf_token(services: &Services) -> Reply {
    Envelope::success(json!({ "token": services.csrf.issue() })).into()
}

/// Authenticated and carrying the configured backend marker header
pub async fn is_backend(user: &mut CurrentUser, request: &ResourceRequest, services: &Services) -> bool {
    if authenticate(user, request, services).await.is_err() {
        return false;
    }
    let security = &services.config.security;
    request.header(&security.backend_header) == Some(security.backend_value.as_str())
}
