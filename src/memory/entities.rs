use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::collection::{loose_eq, MemoryCollection};
use crate::store::{Entity, EntityStore, FileRecord, StoreError, ID_FIELD};
use crate::types::EntityId;

#[derive(Debug, Default)]
struct Table {
    next_id: EntityId,
    rows: BTreeMap<EntityId, Map<String, Value>>,
    attachments: HashMap<(EntityId, String), Vec<FileRecord>>,
}

/// One resource table held in memory. Clones share the same rows.
#[derive(Debug, Clone)]
pub struct MemoryEntityStore {
    resource: String,
    relations: HashSet<String>,
    filterable: Vec<String>,
    table: Arc<RwLock<Table>>,
    deletes: Arc<AtomicUsize>,
}

impl MemoryEntityStore {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            relations: HashSet::new(),
            filterable: Vec::new(),
            table: Arc::new(RwLock::new(Table::default())),
            deletes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations.extend(relations.into_iter().map(Into::into));
        self
    }

    /// Columns the generic collection filter may match on
    pub fn with_filterable<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filterable.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Seed a row directly, bypassing observers and validation
    pub async fn insert(&self, fields: Value) -> Entity {
        let mut entity = Entity::new();
        if let Value::Object(map) = fields {
            entity.fill(&map);
        }
        let mut table = self.table.write().await;
        table.next_id += 1;
        let id = table.next_id;
        table.rows.insert(id, entity.fields().clone());
        entity.set_id(id);
        entity
    }

    pub async fn count(&self) -> usize {
        self.table.read().await.rows.len()
    }

    /// Number of `delete` calls received
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Snapshot of every row, relations included, ordered by id
    pub async fn collection(&self) -> MemoryCollection {
        let table = self.table.read().await;
        let rows = table
            .rows
            .iter()
            .map(|(id, fields)| self.entity_from(&table, *id, fields).to_value())
            .collect();
        MemoryCollection::new(rows).with_filterable(self.filterable.clone())
    }

    fn entity_from(&self, table: &Table, id: EntityId, fields: &Map<String, Value>) -> Entity {
        let mut entity = Entity::existing(id, fields.clone());
        for relation in &self.relations {
            let files = table
                .attachments
                .get(&(id, relation.clone()))
                .cloned()
                .unwrap_or_default();
            entity.set_relation(relation.clone(), files);
        }
        entity
    }

    fn require_relation(&self, relation: &str) -> Result<(), StoreError> {
        if self.relations.contains(relation) {
            Ok(())
        } else {
            Err(StoreError::UnknownRelation(relation.to_string()))
        }
    }
}

fn parse_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    fn has_relation(&self, name: &str) -> bool {
        self.relations.contains(name)
    }

    async fn find_id(&self, column: &str, value: &Value) -> Result<Option<EntityId>, StoreError> {
        let table = self.table.read().await;
        if column == ID_FIELD {
            return Ok(parse_id(value).filter(|id| table.rows.contains_key(id)));
        }
        Ok(table
            .rows
            .iter()
            .find(|(_, fields)| fields.get(column).map(|v| loose_eq(v, value)).unwrap_or(false))
            .map(|(id, _)| *id))
    }

    async fn find(&self, column: &str, value: &Value) -> Result<Option<Entity>, StoreError> {
        match self.find_id(column, value).await? {
            Some(id) => self.load(id).await,
            None => Ok(None),
        }
    }

    async fn load(&self, id: EntityId) -> Result<Option<Entity>, StoreError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .get(&id)
            .map(|fields| self.entity_from(&table, id, fields)))
    }

    async fn save(&self, entity: &mut Entity) -> Result<bool, StoreError> {
        let mut table = self.table.write().await;
        match entity.id() {
            Some(id) => match table.rows.get_mut(&id) {
                Some(row) => {
                    *row = entity.fields().clone();
                    Ok(true)
                }
                None => Ok(false),
            },
            None => {
                table.next_id += 1;
                let id = table.next_id;
                table.rows.insert(id, entity.fields().clone());
                entity.set_id(id);
                tracing::debug!("Inserted {} row {}", self.resource, id);
                Ok(true)
            }
        }
    }

    async fn delete(&self, entity: &Entity) -> Result<bool, StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let id = entity.id().ok_or(StoreError::Unsaved)?;
        let mut table = self.table.write().await;
        table.attachments.retain(|(owner, _), _| *owner != id);
        Ok(table.rows.remove(&id).is_some())
    }

    async fn load_relation(&self, entity: &mut Entity, relation: &str) -> Result<(), StoreError> {
        self.require_relation(relation)?;
        let id = entity.id().ok_or(StoreError::Unsaved)?;
        let files = self
            .table
            .read()
            .await
            .attachments
            .get(&(id, relation.to_string()))
            .cloned()
            .unwrap_or_default();
        entity.set_relation(relation, files);
        Ok(())
    }

    async fn attach(&self, entity: &Entity, relation: &str, file: FileRecord) -> Result<(), StoreError> {
        self.require_relation(relation)?;
        let id = entity.id().ok_or(StoreError::Unsaved)?;
        self.table
            .write()
            .await
            .attachments
            .entry((id, relation.to_string()))
            .or_default()
            .push(file);
        Ok(())
    }

    async fn detach(&self, entity: &Entity, relation: &str, file: &FileRecord) -> Result<(), StoreError> {
        self.require_relation(relation)?;
        let id = entity.id().ok_or(StoreError::Unsaved)?;
        if let Some(files) = self
            .table
            .write()
            .await
            .attachments
            .get_mut(&(id, relation.to_string()))
        {
            files.retain(|f| f.id != file.id);
        }
        Ok(())
    }
}
