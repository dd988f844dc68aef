use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::store::{StoreError, User, UserDirectory};

/// Fixed user set; inactive users exist but never resolve
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    users: HashMap<i64, (User, bool)>,
    lookups: Arc<AtomicUsize>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, (user, true));
        self
    }

    pub fn with_inactive_user(mut self, user: User) -> Self {
        self.users.insert(user.id, (user, false));
        self
    }

    /// Number of `find_active` calls served
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_active(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .get(&id)
            .filter(|(_, active)| *active)
            .map(|(user, _)| user.clone()))
    }
}
