use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::StoreError;
use crate::filter::SortDirection;
use crate::types::EntityId;

/// One page of an `index` listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub data: Vec<Value>,
    pub total: usize,
    pub per_page: usize,
    pub current_page: usize,
    pub last_page: usize,
}

impl Page {
    pub fn new(data: Vec<Value>, total: usize, per_page: usize, current_page: usize) -> Self {
        let per_page = per_page.max(1);
        let last_page = total.div_ceil(per_page).max(1);
        Self {
            data,
            total,
            per_page,
            current_page,
            last_page,
        }
    }
}

/// Rows to skip before a 1-based page, or `None` when it cannot be addressed
pub fn page_offset(per_page: usize, page: usize) -> Option<usize> {
    page.max(1).checked_sub(1)?.checked_mul(per_page.max(1))
}

/// A lazily narrowed set of resource rows.
///
/// `sort` and `filter` are optional capabilities: the engine only calls them
/// when `supports_sort` / `supports_filter` report true. Collections are used
/// through `&mut dyn Collection` by observers, so the trait stays object safe.
#[async_trait]
pub trait Collection: Send + Sync {
    fn supports_sort(&self) -> bool {
        false
    }

    async fn sort(&mut self, _column: &str, _direction: SortDirection) -> Result<(), StoreError> {
        Ok(())
    }

    fn supports_filter(&self) -> bool {
        false
    }

    /// Apply the whole filter mapping at once
    async fn filter(&mut self, _filters: &Map<String, Value>) -> Result<(), StoreError> {
        Ok(())
    }

    /// Keep only rows whose identifier is in `ids`
    async fn intersect(&mut self, ids: &[EntityId]) -> Result<(), StoreError>;

    /// 1-based page
    async fn paginate(&self, per_page: usize, page: usize) -> Result<Page, StoreError>;

    async fn values(&self) -> Result<Vec<Value>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_computes_last_page() {
        assert_eq!(Page::new(vec![], 0, 10, 1).last_page, 1);
        assert_eq!(Page::new(vec![], 21, 10, 1).last_page, 3);
        assert_eq!(Page::new(vec![], 20, 10, 2).last_page, 2);
    }

    #[test]
    fn page_offset_stops_at_overflow() {
        assert_eq!(page_offset(10, 1), Some(0));
        assert_eq!(page_offset(10, 3), Some(20));
        assert_eq!(page_offset(0, 0), Some(0));
        assert_eq!(page_offset(2, usize::MAX), None);
    }
}
