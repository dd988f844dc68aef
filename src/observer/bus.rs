use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::observer::context::HookContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{ExtensionPoint, ObserverBox};
use crate::store::{Collection, Entity};

/// In-process notification bus.
///
/// Observers run in priority order for each extension point. Each one runs
/// under its own timeout and the first failure aborts the remaining chain.
pub struct NotificationBus {
    observers: HashMap<ExtensionPoint, Vec<ObserverBox>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
        }
    }

    pub fn register_observer(&mut self, observer: ObserverBox) -> &mut Self {
        let point = observer.point();
        let name = observer.name();
        let list = self.observers.entry(point).or_default();
        list.push(observer);
        list.sort_by_key(ObserverBox::priority);

        tracing::debug!("Registered observer '{}' for {:?}", name, point);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn applicable<'a>(
        &'a self,
        point: ExtensionPoint,
        resource: &'a str,
    ) -> impl Iterator<Item = &'a ObserverBox> + 'a {
        self.observers
            .get(&point)
            .into_iter()
            .flatten()
            .filter(move |o| {
                let applies = o.applies_to_resource(resource);
                if !applies {
                    tracing::trace!("Observer {} skipped - doesn't apply to {}", o.name(), resource);
                }
                applies
            })
    }

    /// Partial filter maps contributed by before-filter observers, in order
    pub async fn fire_before_filter(
        &self,
        ctx: &HookContext,
        filters: &Map<String, Value>,
    ) -> Result<Vec<Map<String, Value>>, ObserverError> {
        let mut partials = Vec::new();
        for observer in self.applicable(ExtensionPoint::BeforeFilter, &ctx.resource) {
            if let ObserverBox::BeforeFilter(o) = observer {
                if let Some(partial) = guarded(observer, o.execute(ctx, filters)).await? {
                    partials.push(partial);
                }
            }
        }
        Ok(partials)
    }

    pub async fn fire_extend_index(
        &self,
        ctx: &HookContext,
        collection: &mut dyn Collection,
    ) -> Result<(), ObserverError> {
        for observer in self.applicable(ExtensionPoint::ExtendIndex, &ctx.resource) {
            if let ObserverBox::ExtendIndex(o) = observer {
                guarded(observer, o.execute(ctx, &mut *collection)).await?;
            }
        }
        Ok(())
    }

    pub async fn fire_extend_list(
        &self,
        ctx: &HookContext,
        collection: &mut dyn Collection,
    ) -> Result<(), ObserverError> {
        for observer in self.applicable(ExtensionPoint::ExtendList, &ctx.resource) {
            if let ObserverBox::ExtendList(o) = observer {
                guarded(observer, o.execute(ctx, &mut *collection)).await?;
            }
        }
        Ok(())
    }

    pub async fn fire_before_show(&self, ctx: &HookContext, identifier: &mut Value) -> Result<(), ObserverError> {
        for observer in self.applicable(ExtensionPoint::BeforeShow, &ctx.resource) {
            if let ObserverBox::BeforeShow(o) = observer {
                guarded(observer, o.execute(ctx, &mut *identifier)).await?;
            }
        }
        Ok(())
    }

    pub async fn fire_extend_show(&self, ctx: &HookContext, entity: &mut Entity) -> Result<(), ObserverError> {
        for observer in self.applicable(ExtensionPoint::ExtendShow, &ctx.resource) {
            if let ObserverBox::ExtendShow(o) = observer {
                guarded(observer, o.execute(ctx, &mut *entity)).await?;
            }
        }
        Ok(())
    }

    pub async fn fire_before_save(
        &self,
        ctx: &HookContext,
        entity: &Entity,
        data: &mut Map<String, Value>,
    ) -> Result<(), ObserverError> {
        for observer in self.applicable(ExtensionPoint::BeforeSave, &ctx.resource) {
            if let ObserverBox::BeforeSave(o) = observer {
                guarded(observer, o.execute(ctx, entity, &mut *data)).await?;
            }
        }
        Ok(())
    }

    pub async fn fire_after_save(
        &self,
        ctx: &HookContext,
        entity: &Entity,
        data: &Map<String, Value>,
    ) -> Result<(), ObserverError> {
        for observer in self.applicable(ExtensionPoint::AfterSave, &ctx.resource) {
            if let ObserverBox::AfterSave(o) = observer {
                guarded(observer, o.execute(ctx, entity, data)).await?;
            }
        }
        Ok(())
    }

    pub async fn fire_before_destroy(&self, ctx: &HookContext, entity: &Entity) -> Result<(), ObserverError> {
        for observer in self.applicable(ExtensionPoint::BeforeDestroy, &ctx.resource) {
            if let ObserverBox::BeforeDestroy(o) = observer {
                guarded(observer, o.execute(ctx, entity)).await?;
            }
        }
        Ok(())
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one observer with timeout protection
async fn guarded<T, F>(observer: &ObserverBox, fut: F) -> Result<T, ObserverError>
where
    F: Future<Output = Result<T, ObserverError>>,
{
    let limit: Duration = observer.timeout();
    let started = Instant::now();

    match timeout(limit, fut).await {
        Ok(Ok(value)) => {
            tracing::debug!(
                "Observer: {} completed successfully in {:?}",
                observer.name(),
                started.elapsed()
            );
            Ok(value)
        }
        Ok(Err(error)) => {
            tracing::warn!(
                "Observer: {} failed in {:?}: {}",
                observer.name(),
                started.elapsed(),
                error
            );
            Err(error)
        }
        Err(_elapsed) => {
            tracing::error!("Observer: {} timed out after {:?}", observer.name(), limit);
            Err(ObserverError::TimeoutError(format!(
                "Observer {} timed out after {:?}",
                observer.name(),
                limit
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::traits::*;
    use crate::types::Action;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct AddFilter {
        name: &'static str,
        priority: u8,
        key: &'static str,
        value: Value,
    }

    impl Observer for AddFilter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> u8 {
            self.priority
        }
    }

    #[async_trait]
    impl BeforeFilterObserver for AddFilter {
        async fn execute(
            &self,
            _ctx: &HookContext,
            _filters: &Map<String, Value>,
        ) -> Result<Option<Map<String, Value>>, ObserverError> {
            let mut map = Map::new();
            map.insert(self.key.to_string(), self.value.clone());
            Ok(Some(map))
        }
    }

    fn ctx() -> HookContext {
        HookContext::new("posts", Action::Index)
    }

    #[tokio::test]
    async fn before_filter_runs_in_priority_order() {
        let mut bus = NotificationBus::new();
        bus.register_observer(ObserverBox::BeforeFilter(Box::new(AddFilter {
            name: "late",
            priority: 90,
            key: "status",
            value: json!("late"),
        })));
        bus.register_observer(ObserverBox::BeforeFilter(Box::new(AddFilter {
            name: "early",
            priority: 10,
            key: "status",
            value: json!("early"),
        })));

        let partials = bus.fire_before_filter(&ctx(), &Map::new()).await.unwrap();
        assert_eq!(partials.len(), 2);
        assert_eq!(partials[0]["status"], json!("early"));
        assert_eq!(partials[1]["status"], json!("late"));
    }

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
        only: Option<&'static str>,
    }

    impl Observer for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn applies_to_resource(&self, resource: &str) -> bool {
            self.only.map(|r| r == resource).unwrap_or(true)
        }
    }

    #[async_trait]
    impl BeforeSaveObserver for Recorder {
        async fn execute(
            &self,
            _ctx: &HookContext,
            _entity: &Entity,
            data: &mut Map<String, Value>,
        ) -> Result<(), ObserverError> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(ObserverError::ValidationError("rejected".into()));
            }
            data.insert("touched_by".into(), json!(self.name));
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_error_aborts_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = NotificationBus::new();
        for (name, fail) in [("a", false), ("b", true), ("c", false)] {
            bus.register_observer(ObserverBox::BeforeSave(Box::new(Recorder {
                name,
                log: log.clone(),
                fail,
                only: None,
            })));
        }

        let mut data = Map::new();
        let err = bus
            .fire_before_save(&ctx(), &Entity::new(), &mut data)
            .await
            .unwrap_err();
        assert_eq!(err, ObserverError::ValidationError("rejected".into()));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(data["touched_by"], json!("a"));
    }

    #[tokio::test]
    async fn observers_for_other_resources_are_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = NotificationBus::new();
        bus.register_observer(ObserverBox::BeforeSave(Box::new(Recorder {
            name: "users-only",
            log: log.clone(),
            fail: false,
            only: Some("users"),
        })));

        let mut data = Map::new();
        bus.fire_before_save(&ctx(), &Entity::new(), &mut data).await.unwrap();
        assert!(log.lock().unwrap().is_empty());
        assert!(data.is_empty());
    }

    struct Slow;

    impl Observer for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(10)
        }
    }

    #[async_trait]
    impl BeforeDestroyObserver for Slow {
        async fn execute(&self, _ctx: &HookContext, _entity: &Entity) -> Result<(), ObserverError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_observer_times_out() {
        let mut bus = NotificationBus::new();
        bus.register_observer(ObserverBox::BeforeDestroy(Box::new(Slow)));
        let err = bus.fire_before_destroy(&ctx(), &Entity::new()).await.unwrap_err();
        assert!(matches!(err, ObserverError::TimeoutError(_)));
    }
}
