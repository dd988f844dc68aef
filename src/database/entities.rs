use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::bind::{as_text, json_row};
use super::collection::PgCollection;
use super::manager::DatabaseError;
use crate::filter::filter_where::validate_identifier;
use crate::filter::FilterQuery;
use crate::store::{Entity, EntityStore, FileRecord, StoreError, ID_FIELD};
use crate::types::EntityId;

/// Link table between resource rows and `system_files`
const ATTACHMENTS_TABLE: &str = "system_file_attachments";

/// Rows of one table, read and written as JSON through
/// `row_to_json` / `jsonb_populate_record`.
///
/// The table needs a `bigint` `id` with a default. Only keys that name a
/// real column are written; the column list is read once from
/// `information_schema`.
pub struct PgEntityStore {
    pool: PgPool,
    table: String,
    relations: HashSet<String>,
    soft_delete: Option<String>,
    columns: OnceCell<Vec<String>>,
}

impl PgEntityStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self, DatabaseError> {
        let table = table.into();
        validate_identifier(&table).map_err(DatabaseError::QueryError)?;
        Ok(Self {
            pool,
            table,
            relations: HashSet::new(),
            soft_delete: None,
            columns: OnceCell::new(),
        })
    }

    pub fn with_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations.extend(relations.into_iter().map(Into::into));
        self
    }

    /// Collections skip rows where this column is set
    pub fn with_soft_delete(mut self, column: impl Into<String>) -> Result<Self, DatabaseError> {
        let column = column.into();
        validate_identifier(&column).map_err(DatabaseError::QueryError)?;
        self.soft_delete = Some(column);
        Ok(self)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Unfiltered collection over the table; the generic filter is limited
    /// to real columns
    pub async fn collection(&self) -> Result<PgCollection, StoreError> {
        let mut query = FilterQuery::new(self.table.as_str())?.allow_columns(self.columns().await?.iter().cloned())?;
        if let Some(column) = &self.soft_delete {
            query = query.soft_delete(column.as_str())?;
        }
        Ok(PgCollection::new(self.pool.clone(), query))
    }

    async fn columns(&self) -> Result<&Vec<String>, DatabaseError> {
        self.columns
            .get_or_try_init(|| async {
                let rows = sqlx::query(
                    "SELECT column_name::text AS name FROM information_schema.columns \
                     WHERE table_schema = current_schema() AND table_name = $1 ORDER BY ordinal_position",
                )
                .bind(&self.table)
                .fetch_all(&self.pool)
                .await?;
                let names = rows
                    .iter()
                    .map(|r| r.try_get::<String, _>("name"))
                    .collect::<Result<Vec<_>, _>>()?;
                tracing::debug!("{}: {} column(s)", self.table, names.len());
                Ok::<_, DatabaseError>(names)
            })
            .await
    }

    /// Writable columns present in `fields`, id excluded
    async fn writable(&self, fields: &Map<String, Value>) -> Result<Vec<String>, DatabaseError> {
        let columns = self.columns().await?;
        Ok(fields
            .keys()
            .filter(|k| k.as_str() != ID_FIELD && columns.contains(k))
            .cloned()
            .collect())
    }

    fn require_relation(&self, relation: &str) -> Result<(), StoreError> {
        if self.relations.contains(relation) {
            Ok(())
        } else {
            Err(StoreError::UnknownRelation(relation.to_string()))
        }
    }

    async fn insert(&self, entity: &mut Entity) -> Result<bool, DatabaseError> {
        let columns = self.writable(entity.fields()).await?;
        let sql = if columns.is_empty() {
            format!("INSERT INTO \"{}\" DEFAULT VALUES RETURNING \"id\"", self.table)
        } else {
            let list = quoted(&columns);
            format!(
                "INSERT INTO \"{t}\" ({list}) SELECT {list} FROM jsonb_populate_record(NULL::\"{t}\", $1::jsonb) RETURNING \"id\"",
                t = self.table,
                list = list
            )
        };

        let payload = Value::Object(entity.fields().clone());
        let row = sqlx::query(&sql).bind(&payload).fetch_one(&self.pool).await?;
        let id: i64 = row.try_get("id")?;
        entity.set_id(id);
        tracing::debug!("Inserted {} row {}", self.table, id);
        Ok(true)
    }

    async fn update(&self, id: EntityId, entity: &Entity) -> Result<bool, DatabaseError> {
        let columns = self.writable(entity.fields()).await?;
        if columns.is_empty() {
            return Ok(true);
        }
        let assignments = columns
            .iter()
            .map(|c| format!("\"{c}\" = r.\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE \"{t}\" SET {assignments} FROM jsonb_populate_record(NULL::\"{t}\", $1::jsonb) r WHERE \"{t}\".\"id\" = $2",
            t = self.table,
            assignments = assignments
        );

        let payload = Value::Object(entity.fields().clone());
        let result = sqlx::query(&sql).bind(&payload).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn quoted(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl EntityStore for PgEntityStore {
    fn has_relation(&self, name: &str) -> bool {
        self.relations.contains(name)
    }

    async fn find_id(&self, column: &str, value: &Value) -> Result<Option<EntityId>, StoreError> {
        validate_identifier(column).map_err(StoreError::InvalidColumn)?;
        let sql = format!(
            "SELECT \"id\" FROM \"{}\" WHERE \"{}\"::text = $1 LIMIT 1",
            self.table, column
        );
        let row = sqlx::query(&sql)
            .bind(as_text(value))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get::<i64, _>("id")).transpose()?)
    }

    async fn find(&self, column: &str, value: &Value) -> Result<Option<Entity>, StoreError> {
        match self.find_id(column, value).await? {
            Some(id) => self.load(id).await,
            None => Ok(None),
        }
    }

    async fn load(&self, id: EntityId) -> Result<Option<Entity>, StoreError> {
        let sql = format!(
            "SELECT row_to_json(t)::jsonb AS row FROM \"{}\" t WHERE \"id\" = $1",
            self.table
        );
        let Some(row) = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };

        let fields = match json_row(&row)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut entity = Entity::existing(id, fields);
        for relation in &self.relations {
            self.load_relation(&mut entity, relation).await?;
        }
        Ok(Some(entity))
    }

    async fn save(&self, entity: &mut Entity) -> Result<bool, StoreError> {
        let saved = match entity.id() {
            Some(id) => self.update(id, entity).await?,
            None => self.insert(entity).await?,
        };
        Ok(saved)
    }

    async fn delete(&self, entity: &Entity) -> Result<bool, StoreError> {
        let id = entity.id().ok_or(StoreError::Unsaved)?;
        let mut tx = self.pool.begin().await?;

        let links = format!(
            "DELETE FROM \"{}\" WHERE owner_table = $1 AND owner_id = $2",
            ATTACHMENTS_TABLE
        );
        sqlx::query(&links).bind(&self.table).bind(id).execute(&mut *tx).await?;

        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", self.table);
        let result = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_relation(&self, entity: &mut Entity, relation: &str) -> Result<(), StoreError> {
        self.require_relation(relation)?;
        let id = entity.id().ok_or(StoreError::Unsaved)?;

        let sql = format!(
            "SELECT row_to_json(f)::jsonb - 'content' AS row FROM system_files f \
             JOIN \"{}\" a ON a.file_id = f.id \
             WHERE a.owner_table = $1 AND a.owner_id = $2 AND a.relation = $3 \
             ORDER BY f.created_at, f.id",
            ATTACHMENTS_TABLE
        );
        let rows = sqlx::query(&sql)
            .bind(&self.table)
            .bind(id)
            .bind(relation)
            .fetch_all(&self.pool)
            .await?;

        let mut files = Vec::with_capacity(rows.len());
        for row in &rows {
            let record: FileRecord = serde_json::from_value(json_row(row)?)
                .map_err(|e| StoreError::Backend(format!("malformed file row: {}", e)))?;
            files.push(record);
        }
        entity.set_relation(relation, files);
        Ok(())
    }

    async fn attach(&self, entity: &Entity, relation: &str, file: FileRecord) -> Result<(), StoreError> {
        self.require_relation(relation)?;
        let id = entity.id().ok_or(StoreError::Unsaved)?;
        let sql = format!(
            "INSERT INTO \"{}\" (owner_table, owner_id, relation, file_id) VALUES ($1, $2, $3, $4)",
            ATTACHMENTS_TABLE
        );
        sqlx::query(&sql)
            .bind(&self.table)
            .bind(id)
            .bind(relation)
            .bind(file.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn detach(&self, entity: &Entity, relation: &str, file: &FileRecord) -> Result<(), StoreError> {
        self.require_relation(relation)?;
        let id = entity.id().ok_or(StoreError::Unsaved)?;
        let sql = format!(
            "DELETE FROM \"{}\" WHERE owner_table = $1 AND owner_id = $2 AND relation = $3 AND file_id = $4",
            ATTACHMENTS_TABLE
        );
        sqlx::query(&sql)
            .bind(&self.table)
            .bind(id)
            .bind(relation)
            .bind::<Uuid>(file.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_column_lists() {
        assert_eq!(quoted(&["a".to_string(), "b".to_string()]), "\"a\", \"b\"");
    }
}
