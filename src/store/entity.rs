use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::error::StoreError;
use super::files::FileRecord;
use crate::types::EntityId;

/// Field name holding the internal identifier
pub const ID_FIELD: &str = "id";

/// A managed resource row: identifier, plain fields and loaded file relations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    id: Option<EntityId>,
    fields: Map<String, Value>,
    relations: BTreeMap<String, Vec<FileRecord>>,
}

impl Entity {
    /// Transient entity for a create request
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity loaded from a store
    pub fn existing(id: EntityId, mut fields: Map<String, Value>) -> Self {
        fields.remove(ID_FIELD);
        Self {
            id: Some(id),
            fields,
            relations: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    /// Assigned by the store on first save
    pub fn set_id(&mut self, id: EntityId) -> &mut Self {
        self.id = Some(id);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == ID_FIELD {
            return None;
        }
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let field = field.into();
        if field == ID_FIELD {
            tracing::warn!("Attempted to assign '{}' directly - ignoring", ID_FIELD);
            return self;
        }
        self.fields.insert(field, value.into());
        self
    }

    /// Mass-assign input fields; the identifier is never assignable
    pub fn fill(&mut self, data: &Map<String, Value>) -> &mut Self {
        for (key, value) in data {
            self.set(key.clone(), value.clone());
        }
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn relation(&self, name: &str) -> &[FileRecord] {
        self.relations.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_relation(&mut self, name: impl Into<String>, files: Vec<FileRecord>) -> &mut Self {
        self.relations.insert(name.into(), files);
        self
    }

    pub fn relations(&self) -> &BTreeMap<String, Vec<FileRecord>> {
        &self.relations
    }

    /// Default wire shape: `{ id, ...fields, <relation>: [files] }`
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            ID_FIELD.to_string(),
            self.id.map(Value::from).unwrap_or(Value::Null),
        );
        for (k, v) in &self.fields {
            obj.insert(k.clone(), v.clone());
        }
        for (name, files) in &self.relations {
            let files: Vec<Value> = files.iter().map(FileRecord::to_value).collect();
            obj.insert(name.clone(), Value::Array(files));
        }
        Value::Object(obj)
    }
}

/// Entity persistence for one resource type
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Whether `name` is a file relation on this resource type
    fn has_relation(&self, name: &str) -> bool;

    /// Resolve a lookup column value to the internal identifier
    async fn find_id(&self, column: &str, value: &Value) -> Result<Option<EntityId>, StoreError>;

    /// First entity whose `column` equals `value`
    async fn find(&self, column: &str, value: &Value) -> Result<Option<Entity>, StoreError>;

    /// Load by internal identifier, relations included
    async fn load(&self, id: EntityId) -> Result<Option<Entity>, StoreError>;

    /// Insert or update; assigns the identifier on insert
    async fn save(&self, entity: &mut Entity) -> Result<bool, StoreError>;

    async fn delete(&self, entity: &Entity) -> Result<bool, StoreError>;

    /// Refresh one relation on the entity from storage
    async fn load_relation(&self, entity: &mut Entity, relation: &str) -> Result<(), StoreError>;

    async fn attach(&self, entity: &Entity, relation: &str, file: FileRecord) -> Result<(), StoreError>;

    async fn detach(&self, entity: &Entity, relation: &str, file: &FileRecord) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fill_never_assigns_identifier() {
        let mut entity = Entity::existing(7, Map::new());
        let data = json!({ "id": 99, "title": "Hello" });
        entity.fill(data.as_object().unwrap());
        assert_eq!(entity.id(), Some(7));
        assert_eq!(entity.get("title"), Some(&json!("Hello")));
        assert!(entity.get("id").is_none());
    }

    #[test]
    fn to_value_includes_id_and_relations() {
        let mut fields = Map::new();
        fields.insert("title".into(), json!("Post"));
        let mut entity = Entity::existing(3, fields);
        entity.set_relation("images", vec![]);
        let v = entity.to_value();
        assert_eq!(v["id"], json!(3));
        assert_eq!(v["title"], json!("Post"));
        assert_eq!(v["images"], json!([]));
    }
}
