//! Token validation, current-user resolution and CSRF tokens.

pub mod csrf;
pub mod current_user;
pub mod jwt;

pub use csrf::CsrfTokens;
pub use current_user::CurrentUser;
pub use jwt::{generate_jwt, issue_token, AuthError, Claims, JwtValidator, TokenValidator};
