/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Internal row identifier assigned by the entity store
pub type EntityId = i64;

/// Controller actions, used for permission checks and observer context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Index,
    List,
    Show,
    Store,
    Update,
    Destroy,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Index => "index",
            Action::List => "list",
            Action::Show => "show",
            Action::Store => "store",
            Action::Update => "update",
            Action::Destroy => "destroy",
        }
    }

    /// Write actions require an authenticated user
    pub fn is_write(&self) -> bool {
        matches!(self, Action::Store | Action::Update | Action::Destroy)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
