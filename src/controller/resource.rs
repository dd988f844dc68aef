use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::attachment::AttachmentDeclaration;
use crate::error::ApiError;
use crate::filter::{FilterRegistry, SortDirection};
use crate::store::{AcceptAll, Collection, Entity, EntityStore, Page, StoreError, User, Validator, ID_FIELD};
use crate::types::Action;

/// Declaration of one resource type.
///
/// Only the store, the collection factory and the filter registry are
/// required. Everything else has the behavior of a plain CRUD resource and
/// can be overridden.
#[async_trait]
pub trait ResourceController: Send + Sync + 'static {
    type Collection: Collection + 'static;

    /// Name the resource is mounted under
    fn name(&self) -> &str;

    fn entities(&self) -> &dyn EntityStore;

    /// Fresh, unfiltered collection for index/list
    async fn make_collection(&self) -> Result<Self::Collection, StoreError>;

    /// Per-field filter functions, matched by filter key
    fn filters(&self) -> &FilterRegistry<Self::Collection>;

    /// Column used to look up records by the identifier in the URL
    fn primary_key(&self) -> &str {
        ID_FIELD
    }

    fn sort_column(&self) -> &str {
        "created_at"
    }

    fn sort_direction(&self) -> SortDirection {
        SortDirection::Desc
    }

    /// `None` uses `pagination.items_per_page`
    fn items_per_page(&self) -> Option<usize> {
        None
    }

    fn attachments(&self) -> AttachmentDeclaration {
        AttachmentDeclaration::standard()
    }

    fn validator(&self) -> &dyn Validator {
        &AcceptAll
    }

    fn has_permission(&self, _action: Action, _user: Option<&User>) -> bool {
        true
    }

    /// Mutate the resolved filter mapping before observers see it
    fn extend_filters(&self, _filters: &mut Map<String, Value>) {}

    async fn extend_index(&self, _collection: &mut Self::Collection) -> Result<(), ApiError> {
        Ok(())
    }

    async fn extend_list(&self, _collection: &mut Self::Collection) -> Result<(), ApiError> {
        Ok(())
    }

    async fn extend_show(&self, _entity: &mut Entity) -> Result<(), ApiError> {
        Ok(())
    }

    /// Runs after input is assigned and before the first save
    fn extend_save(&self, _entity: &mut Entity, _data: &Map<String, Value>) {}

    fn index_resource(&self, page: Page) -> Value {
        serde_json::to_value(&page).unwrap_or_default()
    }

    fn list_resource(&self, rows: Vec<Value>) -> Value {
        Value::Array(rows)
    }

    fn show_resource(&self, entity: &Entity) -> Value {
        entity.to_value()
    }
}
