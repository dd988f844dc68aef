use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;

use super::collection::MemoryCollection;
use super::entities::MemoryEntityStore;
use crate::attachment::AttachmentDeclaration;
use crate::controller::ResourceController;
use crate::filter::{FilterOutcome, FilterRegistry, SortDirection};
use crate::store::{EntityStore, FieldRules, StoreError, User, Validator, ID_FIELD};
use crate::types::Action;

/// Resource controller over a `MemoryEntityStore`
pub struct MemoryResource {
    name: String,
    store: MemoryEntityStore,
    filters: FilterRegistry<MemoryCollection>,
    attachments: AttachmentDeclaration,
    rules: FieldRules,
    primary_key: String,
    sort: (String, SortDirection),
    per_page: Option<usize>,
    writers: Option<String>,
}

impl MemoryResource {
    pub fn new(store: MemoryEntityStore) -> Self {
        Self {
            name: store.resource().to_string(),
            store,
            filters: FilterRegistry::new(),
            attachments: AttachmentDeclaration::standard(),
            rules: FieldRules::new(),
            primary_key: ID_FIELD.to_string(),
            sort: ("created_at".to_string(), SortDirection::Desc),
            per_page: None,
            writers: None,
        }
    }

    pub fn store(&self) -> &MemoryEntityStore {
        &self.store
    }

    /// Exact-match filter on `field`, answered with matching keys
    pub fn filter_on(mut self, field: &str) -> Self {
        let column = field.to_string();
        self.filters.register(field, move |c: &mut MemoryCollection, value: Value| {
            let keys = c.keys_where(&column, &value);
            async move { Ok(FilterOutcome::Keys(keys)) }.boxed()
        });
        self
    }

    pub fn with_attachments(mut self, attachments: AttachmentDeclaration) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_rules(mut self, rules: FieldRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn with_sort(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = (column.into(), direction);
        self
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Restrict writes to members of the group with this code
    pub fn writable_by(mut self, group: impl Into<String>) -> Self {
        self.writers = Some(group.into());
        self
    }
}

#[async_trait]
impl ResourceController for MemoryResource {
    type Collection = MemoryCollection;

    fn name(&self) -> &str {
        &self.name
    }

    fn entities(&self) -> &dyn EntityStore {
        &self.store
    }

    async fn make_collection(&self) -> Result<MemoryCollection, StoreError> {
        Ok(self.store.collection().await)
    }

    fn filters(&self) -> &FilterRegistry<MemoryCollection> {
        &self.filters
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn sort_column(&self) -> &str {
        &self.sort.0
    }

    fn sort_direction(&self) -> SortDirection {
        self.sort.1
    }

    fn items_per_page(&self) -> Option<usize> {
        self.per_page
    }

    fn attachments(&self) -> AttachmentDeclaration {
        self.attachments.clone()
    }

    fn validator(&self) -> &dyn Validator {
        &self.rules
    }

    fn has_permission(&self, action: Action, user: Option<&User>) -> bool {
        match (&self.writers, action.is_write()) {
            (Some(group), true) => user.map(|u| u.in_group(group)).unwrap_or(false),
            _ => true,
        }
    }
}
