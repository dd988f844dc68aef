use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{validate_identifier, FilterWhere};
use super::types::{FilterOrderInfo, SortDirection, SqlResult};
use crate::types::EntityId;

/// Accumulated state of a SQL-backed collection, rendered on demand.
#[derive(Debug, Clone)]
pub struct FilterQuery {
    table_name: String,
    key_column: String,
    allowed_columns: Vec<String>,
    filters: Vec<Map<String, Value>>,
    ids: Option<Vec<EntityId>>,
    order: Vec<FilterOrderInfo>,
    soft_delete_column: Option<String>,
}

impl FilterQuery {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        validate_identifier(&table_name).map_err(FilterError::InvalidTableName)?;
        Ok(Self {
            table_name,
            key_column: "id".to_string(),
            allowed_columns: vec![],
            filters: vec![],
            ids: None,
            order: vec![],
            soft_delete_column: None,
        })
    }

    /// Columns the generic filter may touch; others are ignored
    pub fn allow_columns<I, S>(mut self, columns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            validate_identifier(&column).map_err(FilterError::InvalidColumn)?;
            self.allowed_columns.push(column);
        }
        Ok(self)
    }

    /// Exclude rows where this timestamp column is set
    pub fn soft_delete(mut self, column: impl Into<String>) -> Result<Self, FilterError> {
        let column = column.into();
        validate_identifier(&column).map_err(FilterError::InvalidColumn)?;
        self.soft_delete_column = Some(column);
        Ok(self)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn filter(&mut self, filters: &Map<String, Value>) -> &mut Self {
        self.filters.push(filters.clone());
        self
    }

    /// Narrow to `ids`; repeated calls intersect
    pub fn intersect(&mut self, ids: &[EntityId]) -> &mut Self {
        self.ids = Some(match self.ids.take() {
            Some(current) => current.into_iter().filter(|id| ids.contains(id)).collect(),
            None => ids.to_vec(),
        });
        self
    }

    /// Replace the ordering with a single column. Columns outside
    /// `allowed_columns` (when set) leave the ordering untouched.
    pub fn order_by(&mut self, column: &str, direction: SortDirection) -> Result<&mut Self, FilterError> {
        if !self.allowed_columns.is_empty() && !self.allowed_columns.iter().any(|c| c == column) {
            tracing::debug!("{}: no column '{}', sort skipped", self.table_name, column);
            return Ok(self);
        }
        self.order = vec![FilterOrder::entry(column, direction)?];
        Ok(self)
    }

    pub fn to_sql(&self, limit: Option<usize>, offset: Option<usize>) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_sql()?;
        let limit_clause = match (limit, offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        };

        let query = [
            format!("SELECT row_to_json(t)::jsonb AS row FROM \"{}\" t", self.table_name),
            where_clause,
            FilterOrder::generate(&self.order),
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_sql()?;
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table_name)
        } else {
            format!("SELECT COUNT(*) AS count FROM \"{}\" {}", self.table_name, where_clause)
        };
        Ok(SqlResult { query, params })
    }

    fn where_sql(&self) -> Result<(String, Vec<Value>), FilterError> {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(column) = &self.soft_delete_column {
            conditions.push(format!("\"{}\" IS NULL", column));
        }

        for filters in &self.filters {
            let (sql, values) = FilterWhere::generate(filters, params.len(), &self.allowed_columns)?;
            conditions.extend(sql);
            params.extend(values);
        }

        if let Some(ids) = &self.ids {
            if ids.is_empty() {
                conditions.push("1=0".to_string());
            } else {
                params.push(Value::from(ids.clone()));
                conditions.push(format!(
                    "\"{}\" = ANY(ARRAY(SELECT jsonb_array_elements_text(${}::jsonb)::bigint))",
                    self.key_column,
                    params.len()
                ));
            }
        }

        if conditions.is_empty() {
            Ok((String::new(), params))
        } else {
            Ok((format!("WHERE {}", conditions.join(" AND ")), params))
        }
    }
}
