use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::store::StoreError;
use crate::types::EntityId;

/// What a per-field filter function did to the collection
pub enum FilterOutcome<C> {
    /// Narrowed the collection in place
    Applied,
    /// Matching keys; the collection is intersected with them
    Keys(Vec<EntityId>),
    /// A new collection replacing the current one
    Replace(C),
}

pub type FilterFuture<'a, C> = BoxFuture<'a, Result<FilterOutcome<C>, StoreError>>;

pub type FilterFn<C> = Arc<dyn for<'a> Fn(&'a mut C, Value) -> FilterFuture<'a, C> + Send + Sync>;

/// Per-field filter functions declared by a controller, keyed by filter name
pub struct FilterRegistry<C> {
    filters: HashMap<String, FilterFn<C>>,
}

impl<C> FilterRegistry<C> {
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Register a filter function under `name`
    ///
    /// ```ignore
    /// registry.register("status", |c: &mut MemoryCollection, v| {
    ///     async move { c.retain_field("status", &v); Ok(FilterOutcome::Applied) }.boxed()
    /// });
    /// ```
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut C, Value) -> FilterFuture<'a, C> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!("Registered filter '{}'", name);
        self.filters.insert(name, Arc::new(f));
        self
    }

    /// Exact name first, then its camelCase form
    pub fn lookup(&self, key: &str) -> Option<&FilterFn<C>> {
        self.filters
            .get(key)
            .or_else(|| self.filters.get(&camel_case(key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<C> Default for FilterRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for FilterRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
        }
    }
}

/// `is_active` / `is-active` / `is active` -> `isActive`
pub fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for ch in key.chars() {
        if matches!(ch, '_' | '-' | ' ') {
            upper = !out.is_empty();
            continue;
        }
        if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else if out.is_empty() {
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn camel_case_conversion() {
        assert_eq!(camel_case("is_active"), "isActive");
        assert_eq!(camel_case("category-id"), "categoryId");
        assert_eq!(camel_case("status"), "status");
        assert_eq!(camel_case("_leading"), "leading");
    }

    #[test]
    fn lookup_falls_back_to_camel_case() {
        let mut registry: FilterRegistry<Vec<i64>> = FilterRegistry::new();
        registry.register("isActive", |_c: &mut Vec<i64>, _v| {
            async move { Ok(FilterOutcome::Applied) }.boxed()
        });
        assert!(registry.contains("is_active"));
        assert!(registry.contains("isActive"));
        assert!(!registry.contains("status"));
        assert_eq!(registry.len(), 1);
    }
}
