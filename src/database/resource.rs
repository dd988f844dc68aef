use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};

use super::collection::PgCollection;
use super::entities::PgEntityStore;
use crate::attachment::AttachmentDeclaration;
use crate::controller::ResourceController;
use crate::filter::{FilterOutcome, FilterRegistry};
use crate::store::{EntityStore, FieldRules, StoreError, Validator};

/// Resource controller over one PostgreSQL table
pub struct PgResource {
    name: String,
    store: PgEntityStore,
    filters: FilterRegistry<PgCollection>,
    attachments: AttachmentDeclaration,
    rules: FieldRules,
}

impl PgResource {
    pub fn new(name: impl Into<String>, store: PgEntityStore) -> Self {
        Self {
            name: name.into(),
            store,
            filters: FilterRegistry::new(),
            attachments: AttachmentDeclaration::standard(),
            rules: FieldRules::new(),
        }
    }

    /// Equality filter on `column`, pushed down into the SQL
    pub fn filter_on(mut self, column: &str) -> Self {
        let column = column.to_string();
        self.filters.register(column.clone(), move |c: &mut PgCollection, value: Value| {
            let mut condition = Map::new();
            condition.insert(column.clone(), value);
            c.where_json(&condition);
            async { Ok(FilterOutcome::Applied) }.boxed()
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
}

#[async_trait]
impl ResourceController for PgResource {
    type Collection = PgCollection;

    fn name(&self) -> &str {
        &self.name
    }

    fn entities(&self) -> &dyn EntityStore {
        &self.store
    }

    async fn make_collection(&self) -> Result<PgCollection, StoreError> {
        self.store.collection().await
    }

    fn filters(&self) -> &FilterRegistry<PgCollection> {
        &self.filters
    }

    fn attachments(&self) -> AttachmentDeclaration {
        self.attachments.clone()
    }

    fn validator(&self) -> &dyn Validator {
        &self.rules
    }
}
