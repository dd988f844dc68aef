use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Stateless CSRF tokens of the form `nonce.hex(sha256(secret || nonce))`
#[derive(Debug, Clone)]
pub struct CsrfTokens {
    secret: String,
}

impl CsrfTokens {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn issue(&self) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        format!("{}.{}", nonce, self.sign(&nonce))
    }

    pub fn verify(&self, token: &str) -> bool {
        match token.split_once('.') {
            Some((nonce, signature)) if !nonce.is_empty() => self.sign(nonce) == signature,
            _ => false,
        }
    }

    fn sign(&self, nonce: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(nonce.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
