use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id; tokens without one never resolve to a user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<i64>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: Some(user_id),
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Decodes a bearer token into the user id it was issued for
pub trait TokenValidator: Send + Sync {
    /// `Ok(None)` when the token is valid but names no user
    fn subject(&self, token: &str) -> Result<Option<i64>, AuthError>;
}

/// HS256 validation against a shared secret
#[derive(Clone)]
pub struct JwtValidator {
    key: DecodingKey,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Validator for the configured secret, if one is set
    pub fn from_config() -> Option<Self> {
        Self::new(&config::config().security.jwt_secret).ok()
    }
}

impl TokenValidator for JwtValidator {
    fn subject(&self, token: &str) -> Result<Option<i64>, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims.sub)
    }
}

/// Sign claims with an explicit secret
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Sign claims with the configured secret
pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    issue_token(claims, &config::config().security.jwt_secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips() {
        let token = issue_token(&Claims::new(7, 1), "secret").unwrap();
        let validator = JwtValidator::new("secret").unwrap();
        assert_eq!(validator.subject(&token).unwrap(), Some(7));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&Claims::new(7, 1), "secret").unwrap();
        let validator = JwtValidator::new("other").unwrap();
        assert!(matches!(validator.subject(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn token_without_subject() {
        let claims = Claims {
            sub: None,
            exp: Utc::now().timestamp() + 600,
            iat: Utc::now().timestamp(),
        };
        let token = issue_token(&claims, "secret").unwrap();
        let validator = JwtValidator::new("secret").unwrap();
        assert_eq!(validator.subject(&token).unwrap(), None);
    }

    #[test]
    fn empty_secret_is_invalid() {
        assert!(JwtValidator::new("").is_err());
        assert_eq!(issue_token(&Claims::new(1, 1), ""), Err(AuthError::InvalidSecret));
    }
}
