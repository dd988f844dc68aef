//! Named component instances shared across requests, plus the plugin registry.
//!
//! The cache is constructed once and injected into every controller handler.
//! Components are memoized by name with no eviction, so they must be
//! stateless or configuration-only.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ApiError;

pub trait Component: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn properties(&self) -> &Map<String, Value>;
}

pub type ComponentFactory = Arc<dyn Fn(&Map<String, Value>) -> Option<Arc<dyn Component>> + Send + Sync>;

pub struct ComponentCache {
    factories: HashMap<String, ComponentFactory>,
    plugins: HashSet<String>,
    instances: Arc<RwLock<HashMap<String, Arc<dyn Component>>>>,
}

impl ComponentCache {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            plugins: HashSet::new(),
            instances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Map<String, Value>) -> Option<Arc<dyn Component>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn register_plugin(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.plugins.insert(namespace.into());
        self
    }

    pub fn has_plugin(&self, namespace: &str) -> bool {
        self.plugins.contains(namespace)
    }

    /// Cached instance by name, built on first use with `properties`.
    ///
    /// Later calls return the first instance regardless of `properties`.
    pub async fn component(
        &self,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<Arc<dyn Component>, ApiError> {
        if let Some(existing) = self.instances.read().await.get(name) {
            return Ok(existing.clone());
        }

        let mut instances = self.instances.write().await;
        if let Some(existing) = instances.get(name) {
            return Ok(existing.clone());
        }

        let component = self
            .factories
            .get(name)
            .and_then(|factory| factory(properties))
            .ok_or_else(|| ApiError::Component(format!("component not found: {}", name)))?;

        tracing::debug!("Created component '{}'", name);
        instances.insert(name.to_string(), component.clone());
        Ok(component)
    }

    pub async fn cached_count(&self) -> usize {
        self.instances.read().await.len()
    }
}

impl Default for ComponentCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Component holding only its construction properties
#[derive(Debug, Clone)]
pub struct StaticComponent {
    name: String,
    properties: Map<String, Value>,
}

impl StaticComponent {
    pub fn new(name: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }
}

impl Component for StaticComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn components_are_memoized_by_name() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let mut cache = ComponentCache::new();
        cache.register_factory("cart", move |props| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(Arc::new(StaticComponent::new("cart", props.clone())) as Arc<dyn Component>)
        });

        let props = json!({ "currency": "EUR" }).as_object().cloned().unwrap();
        let first = cache.component("cart", &props).await.unwrap();
        let second = cache.component("cart", &Map::new()).await.unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(second.properties()["currency"], json!("EUR"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.cached_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_component_fails() {
        let cache = ComponentCache::new();
        let err = cache.component("missing", &Map::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Component(_)));
    }

    #[test]
    fn plugin_registry() {
        let mut cache = ComponentCache::new();
        cache.register_plugin("Acme.Shop");
        assert!(cache.has_plugin("Acme.Shop"));
        assert!(!cache.has_plugin("Acme.Blog"));
    }
}
