use super::jwt::TokenValidator;
use crate::error::ApiError;
use crate::store::{User, UserDirectory};

/// Request-scoped, memoized current user
#[derive(Debug, Default)]
pub struct CurrentUser {
    cached: Option<User>,
}

impl CurrentUser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Already resolved user, without attempting resolution
    pub fn get(&self) -> Option<&User> {
        self.cached.as_ref()
    }

    /// Resolve once; later calls return the cached user without touching
    /// the validator or the directory. Failures are not cached.
    pub async fn resolve(
        &mut self,
        token: Option<&str>,
        tokens: Option<&dyn TokenValidator>,
        users: &dyn UserDirectory,
    ) -> Result<&User, ApiError> {
        if self.cached.is_none() {
            let user = Self::lookup(token, tokens, users).await?;
            tracing::debug!("Resolved current user {}", user.id);
            self.cached = Some(user);
        }
        self.cached.as_ref().ok_or(ApiError::UserNotFound)
    }

    async fn lookup(
        token: Option<&str>,
        tokens: Option<&dyn TokenValidator>,
        users: &dyn UserDirectory,
    ) -> Result<User, ApiError> {
        let validator = tokens.ok_or(ApiError::JwtNotConfigured)?;
        let token = token.filter(|t| !t.is_empty()).ok_or(ApiError::TokenNotFound)?;

        let user_id = validator
            .subject(token)
            .map_err(|e| ApiError::AccessDenied(e.to_string()))?
            .ok_or(ApiError::UserNotFound)?;

        users.find_active(user_id).await?.ok_or(ApiError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{issue_token, Claims, JwtValidator};
    use crate::memory::MemoryUserDirectory;
    use crate::store::Group;

    fn directory() -> MemoryUserDirectory {
        MemoryUserDirectory::new()
            .with_user(User {
                id: 1,
                name: "Ada".into(),
                email: None,
                groups: vec![Group {
                    id: 1,
                    code: "editors".into(),
                    name: "Editors".into(),
                }],
            })
            .with_inactive_user(User {
                id: 2,
                name: "Banned".into(),
                email: None,
                groups: vec![],
            })
    }

    #[tokio::test]
    async fn resolves_and_memoizes() {
        let users = directory();
        let validator = JwtValidator::new("k").unwrap();
        let token = issue_token(&Claims::new(1, 1), "k").unwrap();

        let mut current = CurrentUser::new();
        let user = current.resolve(Some(&token), Some(&validator), &users).await.unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(users.lookups(), 1);

        current.resolve(None, None, &users).await.unwrap();
        assert_eq!(users.lookups(), 1);
    }

    #[tokio::test]
    async fn failure_kinds() {
        let users = directory();
        let validator = JwtValidator::new("k").unwrap();

        let err = CurrentUser::new().resolve(Some("t"), None, &users).await.unwrap_err();
        assert!(matches!(err, ApiError::JwtNotConfigured));

        let err = CurrentUser::new().resolve(None, Some(&validator), &users).await.unwrap_err();
        assert!(matches!(err, ApiError::TokenNotFound));

        let inactive = issue_token(&Claims::new(2, 1), "k").unwrap();
        let err = CurrentUser::new()
            .resolve(Some(&inactive), Some(&validator), &users)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UserNotFound));

        let err = CurrentUser::new()
            .resolve(Some("not-a-jwt"), Some(&validator), &users)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied(_)));
    }
}
