use async_trait::async_trait;
use serde_json::{Map, Value};

use super::types::{FilterSortSpec, SortDirection, SortSpec};
use crate::observer::ObserverError;

const SORT_KEY: &str = "sort";
const FILTERS_KEY: &str = "filters";

/// Customization points invoked while a spec is being resolved
#[async_trait]
pub trait FilterHooks: Send + Sync {
    /// Controller-level in-place mutation of the filter mapping
    fn extend_filters(&self, _filters: &mut Map<String, Value>) {}

    /// External before-filter notification; each returned map is merged in order
    async fn before_filter(
        &self,
        _filters: &Map<String, Value>,
    ) -> Result<Vec<Map<String, Value>>, ObserverError> {
        Ok(Vec::new())
    }
}

/// Resolve without any customization
pub struct NoHooks;

impl FilterHooks for NoHooks {}

/// Build the `{sort, filters}` spec for one request.
///
/// Malformed JSON never fails: a sort string that does not decode becomes the
/// column name, and a filters string that does not decode is kept as-is.
pub async fn resolve_spec(
    query: &Map<String, Value>,
    defaults: SortSpec,
    hooks: &dyn FilterHooks,
) -> Result<FilterSortSpec, ObserverError> {
    let mut sort = read_sort(query.get(SORT_KEY), defaults);
    let mut filters = read_filters(query);

    hooks.extend_filters(&mut filters);

    for partial in hooks.before_filter(&filters).await? {
        for (key, value) in partial {
            filters.insert(key, value);
        }
    }

    if let Some(value) = filters.remove(SORT_KEY) {
        // The whole-query fallback carries the query-level sort again; only a
        // filter-level value differing from it overrides the column
        if let Value::String(column) = &value {
            if !column.is_empty() && query.get(SORT_KEY) != Some(&value) {
                sort.column = column.clone();
            }
        }
    }

    tracing::debug!(
        "Resolved sort {}:{} with {} filter(s)",
        sort.column,
        sort.direction.as_str(),
        filters.len()
    );

    Ok(FilterSortSpec { sort, filters })
}

fn read_sort(raw: Option<&Value>, defaults: SortSpec) -> SortSpec {
    let mut sort = defaults;
    match raw {
        Some(Value::Object(obj)) => merge_sort(&mut sort, obj),
        Some(Value::String(s)) if !s.is_empty() => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(obj)) => merge_sort(&mut sort, &obj),
            _ => sort.column = s.clone(),
        },
        _ => {}
    }
    sort
}

fn merge_sort(sort: &mut SortSpec, obj: &Map<String, Value>) {
    if let Some(column) = obj.get("column").and_then(Value::as_str) {
        sort.column = column.to_string();
    }
    if let Some(direction) = obj
        .get("direction")
        .and_then(Value::as_str)
        .and_then(|d| d.parse::<SortDirection>().ok())
    {
        sort.direction = direction;
    }
}

fn read_filters(query: &Map<String, Value>) -> Map<String, Value> {
    let raw = match query.get(FILTERS_KEY) {
        Some(v) if !crate::request::is_falsy(Some(v)) => v.clone(),
        _ => {
            let mut all = query.clone();
            all.remove(FILTERS_KEY);
            Value::Object(all)
        }
    };

    let decoded = match raw {
        Value::String(s) => serde_json::from_str::<Value>(&s).unwrap_or(Value::String(s)),
        other => other,
    };

    match decoded {
        Value::Object(map) => map,
        other => {
            tracing::debug!("Ignoring non-object filters value: {}", other);
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn defaults() -> SortSpec {
        SortSpec::new("created_at", SortDirection::Desc)
    }

    #[tokio::test]
    async fn defaults_apply_without_parameters() {
        let spec = resolve_spec(&Map::new(), defaults(), &NoHooks).await.unwrap();
        assert_eq!(spec.sort, defaults());
        assert!(spec.filters.is_empty());
    }

    #[tokio::test]
    async fn plain_sort_string_is_column_only() {
        let spec = resolve_spec(&query(json!({ "sort": "name" })), defaults(), &NoHooks)
            .await
            .unwrap();
        assert_eq!(spec.sort, SortSpec::new("name", SortDirection::Desc));
        assert!(spec.filters.is_empty());
    }

    #[tokio::test]
    async fn json_sort_merges_over_defaults() {
        let q = query(json!({ "sort": r#"{"direction":"asc"}"# }));
        let spec = resolve_spec(&q, defaults(), &NoHooks).await.unwrap();
        assert_eq!(spec.sort, SortSpec::new("created_at", SortDirection::Asc));
    }

    #[tokio::test]
    async fn json_filters_match_native_mapping() {
        let encoded = query(json!({ "filters": r#"{"status":"active","sort":"title"}"#, "sort": "name" }));
        let native = query(json!({ "filters": { "status": "active", "sort": "title" }, "sort": "name" }));
        let a = resolve_spec(&encoded, defaults(), &NoHooks).await.unwrap();
        let b = resolve_spec(&native, defaults(), &NoHooks).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.sort.column, "title");
        assert_eq!(a.filters, query(json!({ "status": "active" })));
    }

    #[tokio::test]
    async fn malformed_filters_degrade_gracefully() {
        let q = query(json!({ "filters": "{not json" }));
        let spec = resolve_spec(&q, defaults(), &NoHooks).await.unwrap();
        assert!(spec.filters.is_empty());
    }

    #[tokio::test]
    async fn whole_query_is_the_fallback() {
        let q = query(json!({ "status": "draft", "page": "2", "sort": r#"{"column":"title"}"# }));
        let spec = resolve_spec(&q, defaults(), &NoHooks).await.unwrap();
        assert_eq!(spec.sort.column, "title");
        assert_eq!(spec.filters, query(json!({ "status": "draft", "page": "2" })));
    }

    struct Hooks;

    #[async_trait]
    impl FilterHooks for Hooks {
        fn extend_filters(&self, filters: &mut Map<String, Value>) {
            filters.insert("category".into(), json!(4));
        }

        async fn before_filter(
            &self,
            filters: &Map<String, Value>,
        ) -> Result<Vec<Map<String, Value>>, ObserverError> {
            assert_eq!(filters.get("category"), Some(&json!(4)));
            Ok(vec![
                query(json!({ "category": 5, "active": true })),
                query(json!({ "category": 6, "sort": "price" })),
            ])
        }
    }

    #[tokio::test]
    async fn hooks_merge_last_write_wins() {
        let spec = resolve_spec(&Map::new(), defaults(), &Hooks).await.unwrap();
        assert_eq!(spec.filters, query(json!({ "category": 6, "active": true })));
        assert_eq!(spec.sort.column, "price");
    }
}
