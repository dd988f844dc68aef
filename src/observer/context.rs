use crate::store::User;
use crate::types::Action;

/// What an observer is told about the operation it runs inside
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Resource name the controller is mounted under
    pub resource: String,
    pub action: Action,
    /// Set once the operation has resolved the current user
    pub user: Option<User>,
}

impl HookContext {
    pub fn new(resource: impl Into<String>, action: Action) -> Self {
        Self {
            resource: resource.into(),
            action,
            user: None,
        }
    }

    pub fn with_user(mut self, user: Option<User>) -> Self {
        self.user = user;
        self
    }
}
