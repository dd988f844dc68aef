use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// Authenticated user resolved from a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub groups: Vec<Group>,
}

impl User {
    pub fn in_group(&self, code: &str) -> bool {
        self.groups.iter().any(|g| g.code == code)
    }
}

/// Lookup of active (not banned/deactivated) users
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_active(&self, id: i64) -> Result<Option<User>, StoreError>;
}
