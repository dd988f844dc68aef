use serde_json::{Map, Value};

use super::registry::{FilterOutcome, FilterRegistry};
use super::types::{FilterSortSpec, SortDirection, PAGE_KEY, PER_PAGE_KEY};
use crate::store::{Collection, StoreError};

/// Column value that disables sorting
const NO_SORT: &str = "no";

/// Final `(column, direction)` handed to the sort capability.
///
/// An inline `column|direction` suffix wins over the resolved direction.
pub fn sort_target(column: &str, direction: SortDirection) -> Option<(String, SortDirection)> {
    let column = column.trim();
    if column.is_empty() || column == NO_SORT {
        return None;
    }
    match column.split_once('|') {
        Some((col, dir)) => {
            let col = col.trim();
            if col.is_empty() {
                return None;
            }
            Some((col.to_string(), dir.parse().unwrap_or(direction)))
        }
        None => Some((column.to_string(), direction)),
    }
}

/// Apply a resolved spec to a collection.
///
/// Sort and the generic filter run only when the collection supports them.
/// Afterwards every filter key with a registered function is dispatched to
/// it, in key order. Missing capabilities are skipped silently.
pub async fn apply_spec<C: Collection>(
    mut collection: C,
    spec: &FilterSortSpec,
    registry: &FilterRegistry<C>,
) -> Result<C, StoreError> {
    if collection.supports_sort() {
        if let Some((column, direction)) = sort_target(&spec.sort.column, spec.sort.direction) {
            tracing::debug!("Sorting collection by {} {}", column, direction.as_str());
            collection.sort(&column, direction).await?;
        }
    }

    if spec.filters.is_empty() {
        return Ok(collection);
    }

    if collection.supports_filter() {
        let generic: Map<String, Value> = spec
            .filters
            .iter()
            .filter(|(k, _)| !is_pagination_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !generic.is_empty() {
            collection.filter(&generic).await?;
        }
    }

    for (key, value) in &spec.filters {
        if is_pagination_key(key) {
            continue;
        }
        let Some(filter) = registry.lookup(key) else {
            continue;
        };
        tracing::debug!("Applying filter '{}'", key);
        match filter(&mut collection, value.clone()).await? {
            FilterOutcome::Applied => {}
            FilterOutcome::Keys(ids) => collection.intersect(&ids).await?,
            FilterOutcome::Replace(replacement) => collection = replacement,
        }
    }

    Ok(collection)
}

fn is_pagination_key(key: &str) -> bool {
    key == PAGE_KEY || key == PER_PAGE_KEY
}

/// Page size for this request: a positive `per_page` in input or filters
/// overrides `default`, capped at `max`.
pub fn page_size(
    input: &Map<String, Value>,
    filters: &Map<String, Value>,
    default: usize,
    max: Option<usize>,
) -> usize {
    let requested = input
        .get(PER_PAGE_KEY)
        .or_else(|| filters.get(PER_PAGE_KEY))
        .and_then(positive_usize);

    let size = requested.unwrap_or(default).max(1);
    match max {
        Some(max) if size > max => {
            tracing::debug!("per_page {} exceeds max {}, capping", size, max);
            max
        }
        _ => size,
    }
}

/// Requested page number, 1-based
pub fn page_number(input: &Map<String, Value>) -> usize {
    input.get(PAGE_KEY).and_then(positive_usize).unwrap_or(1)
}

fn positive_usize(value: &Value) -> Option<usize> {
    let n = match value {
        Value::Number(n) => n.as_u64()? as usize,
        Value::String(s) => s.trim().parse::<usize>().ok()?,
        _ => return None,
    };
    (n > 0).then_some(n)
}
