use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

use super::bind::{bind_all, json_row};
use super::manager::DatabaseError;
use crate::filter::{FilterQuery, SortDirection};
use crate::store::{page_offset, Collection, Page, StoreError};
use crate::types::EntityId;

/// Lazily built query over one table; nothing runs until `paginate`/`values`
#[derive(Debug, Clone)]
pub struct PgCollection {
    pool: PgPool,
    query: FilterQuery,
}

impl PgCollection {
    pub fn new(pool: PgPool, query: FilterQuery) -> Self {
        Self { pool, query }
    }

    pub fn query(&self) -> &FilterQuery {
        &self.query
    }

    /// Narrow with the filter language directly (`$and`, `$in`, ...)
    pub fn where_json(&mut self, filters: &Map<String, Value>) -> &mut Self {
        self.query.filter(filters);
        self
    }

    async fn fetch(&self, limit: Option<usize>, offset: Option<usize>) -> Result<Vec<Value>, DatabaseError> {
        let sql = self
            .query
            .to_sql(limit, offset)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        tracing::debug!("{}: {}", self.query.table_name(), sql.query);

        let rows = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(json_row).collect()
    }

    async fn count(&self) -> Result<usize, DatabaseError> {
        let sql = self
            .query
            .to_count_sql()
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        let row = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as usize)
    }
}

#[async_trait]
impl Collection for PgCollection {
    fn supports_sort(&self) -> bool {
        true
    }

    async fn sort(&mut self, column: &str, direction: SortDirection) -> Result<(), StoreError> {
        self.query.order_by(column, direction)?;
        Ok(())
    }

    fn supports_filter(&self) -> bool {
        true
    }

    async fn filter(&mut self, filters: &Map<String, Value>) -> Result<(), StoreError> {
        self.query.filter(filters);
        Ok(())
    }

    async fn intersect(&mut self, ids: &[EntityId]) -> Result<(), StoreError> {
        self.query.intersect(ids);
        Ok(())
    }

    async fn paginate(&self, per_page: usize, page: usize) -> Result<Page, StoreError> {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total = self.count().await?;
        let data = match page_offset(per_page, page) {
            Some(offset) if offset < total => self.fetch(Some(per_page), Some(offset)).await?,
            _ => Vec::new(),
        };
        Ok(Page::new(data, total, per_page, page))
    }

    async fn values(&self) -> Result<Vec<Value>, StoreError> {
        Ok(self.fetch(None, None).await?)
    }
}
