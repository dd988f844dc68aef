use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::filter::SortDirection;
use crate::store::{page_offset, Collection, Page, StoreError, ID_FIELD};
use crate::types::EntityId;

/// Snapshot of resource rows, narrowed and ordered in place
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    rows: Vec<Value>,
    filterable: Vec<String>,
}

impl MemoryCollection {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            filterable: Vec::new(),
        }
    }

    pub fn with_filterable(mut self, columns: Vec<String>) -> Self {
        self.filterable = columns;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep rows whose `field` loosely equals `value` (any element, for arrays)
    pub fn retain_field(&mut self, field: &str, value: &Value) -> &mut Self {
        self.rows.retain(|row| matches(row.get(field), value));
        self
    }

    /// Ids of rows whose `field` loosely equals `value`
    pub fn keys_where(&self, field: &str, value: &Value) -> Vec<EntityId> {
        self.rows
            .iter()
            .filter(|row| matches(row.get(field), value))
            .filter_map(row_id)
            .collect()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.rows.iter().filter_map(row_id).collect()
    }
}

fn row_id(row: &Value) -> Option<EntityId> {
    row.get(ID_FIELD).and_then(Value::as_i64)
}

fn matches(field: Option<&Value>, wanted: &Value) -> bool {
    let Some(field) = field else {
        return wanted.is_null();
    };
    match wanted {
        Value::Array(options) => options.iter().any(|o| loose_eq(field, o)),
        other => loose_eq(field, other),
    }
}

/// Equality that treats `"5"` and `5` (and `"true"`/`true`) as equal
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::String(s), other) | (other, Value::String(s)) => match other {
            Value::Number(n) => s.trim() == n.to_string(),
            Value::Bool(flag) => matches!(
                (s.as_str(), *flag),
                ("1" | "true", true) | ("0" | "false" | "", false)
            ),
            _ => false,
        },
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => false,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn supports_sort(&self) -> bool {
        true
    }

    async fn sort(&mut self, column: &str, direction: SortDirection) -> Result<(), StoreError> {
        self.rows.sort_by(|a, b| {
            let ord = compare(a.get(column), b.get(column));
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        Ok(())
    }

    fn supports_filter(&self) -> bool {
        !self.filterable.is_empty()
    }

    async fn filter(&mut self, filters: &Map<String, Value>) -> Result<(), StoreError> {
        for (key, value) in filters {
            if self.filterable.iter().any(|c| c == key) {
                self.retain_field(key, value);
            }
        }
        Ok(())
    }

    async fn intersect(&mut self, ids: &[EntityId]) -> Result<(), StoreError> {
        self.rows
            .retain(|row| row_id(row).map(|id| ids.contains(&id)).unwrap_or(false));
        Ok(())
    }

    async fn paginate(&self, per_page: usize, page: usize) -> Result<Page, StoreError> {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let data = match page_offset(per_page, page) {
            Some(offset) => self.rows.iter().skip(offset).take(per_page).cloned().collect(),
            None => Vec::new(),
        };
        Ok(Page::new(data, self.rows.len(), per_page, page))
    }

    async fn values(&self) -> Result<Vec<Value>, StoreError> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> MemoryCollection {
        MemoryCollection::new(vec![
            json!({ "id": 1, "name": "beta", "status": "active", "price": 10 }),
            json!({ "id": 2, "name": "alpha", "status": "draft", "price": 30 }),
            json!({ "id": 3, "name": "gamma", "status": "active", "price": 20 }),
        ])
        .with_filterable(vec!["status".to_string()])
    }

    #[tokio::test]
    async fn sorts_in_both_directions() {
        let mut c = rows();
        c.sort("name", SortDirection::Asc).await.unwrap();
        assert_eq!(c.ids(), vec![2, 1, 3]);
        c.sort("price", SortDirection::Desc).await.unwrap();
        assert_eq!(c.ids(), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn generic_filter_only_touches_filterable_columns() {
        let mut c = rows();
        let filters = json!({ "status": "active", "name": "alpha" });
        c.filter(filters.as_object().unwrap()).await.unwrap();
        assert_eq!(c.ids(), vec![1, 3]);
    }

    #[tokio::test]
    async fn paginates() {
        let mut c = rows();
        c.intersect(&[1, 2, 3]).await.unwrap();
        let page = c.paginate(2, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.last_page, 2);
        assert_eq!(page.data, vec![json!({ "id": 3, "name": "gamma", "status": "active", "price": 20 })]);
    }

    #[tokio::test]
    async fn paginates_past_addressable_pages() {
        let c = rows();
        let page = c.paginate(2, usize::MAX).await.unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.current_page, usize::MAX);
    }

    #[test]
    fn loose_equality() {
        assert!(loose_eq(&json!("5"), &json!(5)));
        assert!(loose_eq(&json!(true), &json!("1")));
        assert!(!loose_eq(&json!("a"), &json!(1)));
        assert_eq!(rows().keys_where("status", &json!(["draft"])), vec![2]);
    }
}
