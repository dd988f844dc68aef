use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::resource::ResourceController;
use super::services::Services;
use super::session;
use crate::api::messages::{self, tr};
use crate::api::{Envelope, Reply};
use crate::attachment::AttachmentSynchronizer;
use crate::auth::CurrentUser;
use crate::components::Component;
use crate::error::ApiError;
use crate::filter::{apply_spec, page_number, page_size, resolve_spec, FilterHooks, FilterSortSpec, SortSpec};
use crate::observer::{HookContext, ObserverError};
use crate::request::{normalize, ResourceRequest};
use crate::store::{Collection, Entity, ID_FIELD};
use crate::types::{Action, EntityId};

/// Controller and observer customization, seen by the filter resolver
struct ControllerHooks<'a, C: ResourceController> {
    controller: &'a C,
    services: &'a Services,
    ctx: &'a HookContext,
}

#[async_trait]
impl<'a, C: ResourceController> FilterHooks for ControllerHooks<'a, C> {
    fn extend_filters(&self, filters: &mut Map<String, Value>) {
        self.controller.extend_filters(filters);
    }

    async fn before_filter(&self, filters: &Map<String, Value>) -> Result<Vec<Map<String, Value>>, ObserverError> {
        self.services.bus.fire_before_filter(self.ctx, filters).await
    }
}

/// One request against one resource controller.
///
/// Owns the normalized input and the memoized current user. Every public
/// operation is a failure boundary: errors become failure envelopes here.
pub struct ResourceHandler<'a, C: ResourceController> {
    controller: &'a C,
    services: &'a Services,
    request: ResourceRequest,
    data: Map<String, Value>,
    user: CurrentUser,
}

impl<'a, C: ResourceController> ResourceHandler<'a, C> {
    pub fn new(controller: &'a C, services: &'a Services, request: ResourceRequest) -> Self {
        let data = normalize(&request.input, &controller.attachments());
        Self {
            controller,
            services,
            request,
            data,
            user: CurrentUser::new(),
        }
    }

    /// Normalized input: request input without attachment fields
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn request(&self) -> &ResourceRequest {
        &self.request
    }

    pub async fn index(&mut self) -> Reply {
        tracing::info!("{}: index", self.controller.name());
        match self.try_index().await {
            Ok(value) => Reply::Raw(value),
            Err(err) => self.fail(err),
        }
    }

    pub async fn list(&mut self) -> Reply {
        tracing::info!("{}: list", self.controller.name());
        match self.try_list().await {
            Ok(value) => Reply::Raw(value),
            Err(err) => self.fail(err),
        }
    }

    pub async fn show(&mut self, identifier: Value) -> Reply {
        tracing::info!("{}: show {}", self.controller.name(), identifier);
        match self.try_show(identifier).await {
            Ok(value) => Reply::Raw(value),
            Err(err) => self.fail(err),
        }
    }

    pub async fn store(&mut self) -> Reply {
        tracing::info!("{}: store", self.controller.name());
        match self.try_store().await {
            Ok(envelope) => envelope.into(),
            Err(err) => self.fail(err),
        }
    }

    pub async fn update(&mut self, identifier: Value) -> Reply {
        tracing::info!("{}: update {}", self.controller.name(), identifier);
        match self.try_update(identifier).await {
            Ok(envelope) => envelope.into(),
            Err(err) => self.fail(err),
        }
    }

    pub async fn destroy(&mut self, identifier: Value) -> Reply {
        tracing::info!("{}: destroy {}", self.controller.name(), identifier);
        match self.try_destroy(identifier).await {
            Ok(envelope) => envelope.into(),
            Err(err) => self.fail(err),
        }
    }

    /// Groups of the authenticated user
    pub async fn check(&mut self) -> Reply {
        session::check(&mut self.user, &self.request, self.services).await
    }

    pub fn csrf_token(&self) -> Reply {
        session::csrf_token(self.services)
    }

    /// True only for an authenticated request carrying the backend marker header
    pub async fn is_backend(&mut self) -> bool {
        session::is_backend(&mut self.user, &self.request, self.services).await
    }

    pub async fn component(&self, name: &str, properties: &Map<String, Value>) -> Result<Arc<dyn Component>, ApiError> {
        self.services.components.component(name, properties).await
    }

    pub fn has_plugin(&self, namespace: &str) -> bool {
        self.services.components.has_plugin(namespace)
    }

    fn fail(&self, err: ApiError) -> Reply {
        Reply::Envelope(err.to_envelope(self.services.legacy_status_codes()))
    }

    fn context(&self, action: Action) -> HookContext {
        HookContext::new(self.controller.name(), action).with_user(self.user.get().cloned())
    }

    async fn ensure_user(&mut self) -> Result<(), ApiError> {
        session::authenticate(&mut self.user, &self.request, self.services).await
    }

    fn authorize(&self, action: Action) -> Result<(), ApiError> {
        if self.controller.has_permission(action, self.user.get()) {
            Ok(())
        } else {
            Err(ApiError::PermissionsDenied(format!("{} on {}", action, self.controller.name())))
        }
    }

    /// Make the collection and run the resolved filter/sort spec against it
    async fn prepare_collection(&self, ctx: &HookContext) -> Result<(C::Collection, FilterSortSpec), ApiError> {
        let controller = self.controller;
        let collection = controller.make_collection().await?;

        let hooks = ControllerHooks {
            controller,
            services: self.services,
            ctx,
        };
        let defaults = SortSpec::new(controller.sort_column(), controller.sort_direction());
        let spec = resolve_spec(&self.request.query, defaults, &hooks).await?;

        if self.services.config.filter.debug_logging {
            tracing::debug!("{}: filter spec {:?}", controller.name(), spec);
        }

        let collection = apply_spec(collection, &spec, controller.filters()).await?;
        Ok((collection, spec))
    }

    fn per_page(&self, spec: &FilterSortSpec) -> usize {
        let pagination = &self.services.config.pagination;
        let default = self.controller.items_per_page().unwrap_or(pagination.items_per_page);
        page_size(&self.request.input, &spec.filters, default, pagination.max_per_page)
    }

    async fn try_index(&mut self) -> Result<Value, ApiError> {
        let ctx = self.context(Action::Index);
        let (mut collection, spec) = self.prepare_collection(&ctx).await?;

        self.controller.extend_index(&mut collection).await?;
        self.services.bus.fire_extend_index(&ctx, &mut collection).await?;

        let page = collection
            .paginate(self.per_page(&spec), page_number(&self.request.input))
            .await?;
        Ok(self.controller.index_resource(page))
    }

    async fn try_list(&mut self) -> Result<Value, ApiError> {
        let ctx = self.context(Action::List);
        let (mut collection, _spec) = self.prepare_collection(&ctx).await?;

        self.controller.extend_list(&mut collection).await?;
        self.services.bus.fire_extend_list(&ctx, &mut collection).await?;

        let rows = collection.values().await?;
        Ok(self.controller.list_resource(rows))
    }

    /// Internal id for a URL identifier: parsed directly when the primary
    /// key is `id`, otherwise one lookup by the primary key column
    async fn resolve_id(&self, identifier: &Value) -> Result<Option<EntityId>, ApiError> {
        let key = self.controller.primary_key();
        if key == ID_FIELD {
            return Ok(match identifier {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            });
        }
        Ok(self.controller.entities().find_id(key, identifier).await?)
    }

    async fn try_show(&mut self, identifier: Value) -> Result<Value, ApiError> {
        let ctx = self.context(Action::Show);
        let mut identifier = identifier;
        self.services.bus.fire_before_show(&ctx, &mut identifier).await?;

        let id = self.resolve_id(&identifier).await?.ok_or(ApiError::RecordNotFound)?;
        let mut entity = self
            .controller
            .entities()
            .load(id)
            .await?
            .ok_or(ApiError::RecordNotFound)?;

        self.controller.extend_show(&mut entity).await?;
        self.services.bus.fire_extend_show(&ctx, &mut entity).await?;

        Ok(self.controller.show_resource(&entity))
    }

    async fn find(&self, identifier: &Value) -> Result<Entity, ApiError> {
        self.controller
            .entities()
            .find(self.controller.primary_key(), identifier)
            .await?
            .ok_or(ApiError::RecordNotFound)
    }

    async fn try_store(&mut self) -> Result<Envelope, ApiError> {
        self.ensure_user().await?;
        let mut entity = Entity::new();
        self.authorize(Action::Store)?;

        let saved = self.validate_and_save(Action::Store, &mut entity).await?;
        let data = self.reload(&entity).await?;
        let message = if saved {
            messages::RECORD_CREATED
        } else {
            messages::RECORD_NOT_CREATED
        };
        Ok(Envelope::outcome(saved, data, tr(message)))
    }

    async fn try_update(&mut self, identifier: Value) -> Result<Envelope, ApiError> {
        self.ensure_user().await?;
        let mut entity = self.find(&identifier).await?;
        self.authorize(Action::Update)?;

        let saved = self.validate_and_save(Action::Update, &mut entity).await?;
        let data = self.reload(&entity).await?;
        let message = if saved {
            messages::RECORD_UPDATED
        } else {
            messages::RECORD_NOT_UPDATED
        };
        Ok(Envelope::outcome(saved, data, tr(message)))
    }

    async fn try_destroy(&mut self, identifier: Value) -> Result<Envelope, ApiError> {
        self.ensure_user().await?;
        let entity = self.find(&identifier).await?;
        self.authorize(Action::Destroy)?;

        let ctx = self.context(Action::Destroy);
        self.services.bus.fire_before_destroy(&ctx, &entity).await?;

        let deleted = self.controller.entities().delete(&entity).await?;
        let message = if deleted {
            messages::RECORD_DELETED
        } else {
            messages::RECORD_NOT_DELETED
        };
        Ok(Envelope::outcome(deleted, Value::Null, tr(message)))
    }

    /// before-save observers, validation, then the save sequence
    async fn validate_and_save(&mut self, action: Action, entity: &mut Entity) -> Result<bool, ApiError> {
        let ctx = self.context(action);
        let services = self.services;
        services.bus.fire_before_save(&ctx, entity, &mut self.data).await?;

        self.controller
            .validator()
            .validate(&self.data, entity)
            .map_err(ApiError::validation)?;

        self.save(&ctx, entity).await
    }

    /// Assign fields, save, sync attachments, save again if needed, notify
    async fn save(&self, ctx: &HookContext, entity: &mut Entity) -> Result<bool, ApiError> {
        let controller = self.controller;
        let entities = controller.entities();

        entity.fill(&self.data);
        controller.extend_save(entity, &self.data);

        let mut saved = entities.save(entity).await?;
        if saved {
            let synchronizer = AttachmentSynchronizer::new(
                entities,
                self.services.files.as_ref(),
                self.services.config.attachments.clear_policy,
            );
            if synchronizer
                .sync(entity, &self.request, &controller.attachments())
                .await?
            {
                saved = entities.save(entity).await?;
            }
        }

        self.services.bus.fire_after_save(ctx, entity, &self.data).await?;
        Ok(saved)
    }

    /// Fresh copy from the store, shaped like `show`
    async fn reload(&self, entity: &Entity) -> Result<Value, ApiError> {
        let Some(id) = entity.id() else {
            return Ok(Value::Null);
        };
        Ok(self
            .controller
            .entities()
            .load(id)
            .await?
            .map(|fresh| self.controller.show_resource(&fresh))
            .unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentDeclaration;
    use crate::auth::{issue_token, Claims};
    use crate::config::AppConfig;
    use crate::memory::{MemoryEntityStore, MemoryFileStore, MemoryResource, MemoryUserDirectory};
    use crate::observer::{BeforeDestroyObserver, BeforeSaveObserver, NotificationBus, Observer, ObserverBox};
    use crate::request::UploadedFile;
    use crate::store::{FieldRules, Group, User};
    use crate::filter::SortDirection;
    use serde_json::json;

    const SECRET: &str = "development-secret";

    fn users() -> MemoryUserDirectory {
        MemoryUserDirectory::new()
            .with_user(User {
                id: 1,
                name: "Ada".into(),
                email: None,
                groups: vec![Group {
                    id: 7,
                    code: "editors".into(),
                    name: "Editors".into(),
                }],
            })
            .with_user(User {
                id: 2,
                name: "Reader".into(),
                email: None,
                groups: vec![],
            })
    }

    fn services(files: &MemoryFileStore) -> Services {
        Services::new(AppConfig::development(), Arc::new(users()), Arc::new(files.clone()))
    }

    fn posts() -> MemoryResource {
        MemoryResource::new(MemoryEntityStore::new("posts").with_relations(["preview_image", "images"]))
            .with_sort("id", SortDirection::Asc)
            .filter_on("status")
    }

    fn token(user: i64) -> String {
        issue_token(&Claims::new(user, 1), SECRET).unwrap()
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    async fn seed(resource: &MemoryResource) {
        let store = resource.store();
        store.insert(json!({ "title": "one", "status": "draft" })).await;
        store.insert(json!({ "title": "two", "status": "published" })).await;
        store.insert(json!({ "title": "three", "status": "published" })).await;
    }

    #[tokio::test]
    async fn index_filters_sorts_and_paginates() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts();
        seed(&resource).await;

        let request = ResourceRequest::new()
            .with_query(obj(json!({ "filters": "{\"status\":\"published\"}", "sort": "id|desc" })))
            .with_input(obj(json!({ "per_page": 1 })));
        let reply = ResourceHandler::new(&resource, &services, request).index().await;

        assert!(matches!(reply, Reply::Raw(_)));
        let body = reply.body();
        assert_eq!(body["total"], json!(2));
        assert_eq!(body["per_page"], json!(1));
        assert_eq!(body["data"][0]["title"], json!("three"));
    }

    #[tokio::test]
    async fn list_returns_every_matching_row() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts();
        seed(&resource).await;

        let request = ResourceRequest::new().with_query(obj(json!({ "status": "draft" })));
        let body = ResourceHandler::new(&resource, &services, request).list().await.body();
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["title"], json!("one"));
    }

    #[tokio::test]
    async fn show_by_alternate_primary_key() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts().with_primary_key("title");
        seed(&resource).await;

        let reply = ResourceHandler::new(&resource, &services, ResourceRequest::new())
            .show(json!("two"))
            .await;
        assert_eq!(reply.body()["id"], json!(2));

        let missing = ResourceHandler::new(&resource, &services, ResourceRequest::new())
            .show(json!("nope"))
            .await;
        assert_eq!(missing.status().as_u16(), 403);
        assert_eq!(missing.envelope().and_then(|e| e.message()), Some("record_not_found"));
    }

    #[tokio::test]
    async fn store_creates_with_upload() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts();

        let request = ResourceRequest::new()
            .with_token(token(1))
            .with_input(obj(json!({ "title": "hello", "preview_image": "ignored" })))
            .with_file("preview_image", UploadedFile::new("a.png", Some("image/png".into()), vec![1, 2]));
        let mut handler = ResourceHandler::new(&resource, &services, request);
        assert!(!handler.data().contains_key("preview_image"));

        let reply = handler.store().await;
        let envelope = reply.envelope().cloned().unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.message(), Some("record created"));
        assert_eq!(envelope.data()["title"], json!("hello"));
        assert_eq!(envelope.data()["preview_image"].as_array().map(Vec::len), Some(1));
        assert_eq!(files.len().await, 1);
    }

    #[tokio::test]
    async fn store_requires_a_user() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts();

        let reply = ResourceHandler::new(&resource, &services, ResourceRequest::new())
            .store()
            .await;
        assert_eq!(reply.status().as_u16(), 403);
        assert_eq!(reply.envelope().and_then(|e| e.message()), Some("token_not_found"));
        assert_eq!(resource.store().count().await, 0);
    }

    #[tokio::test]
    async fn store_rejects_invalid_input() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts().with_rules(FieldRules::new().rule("title", "required|string"));

        let request = ResourceRequest::new().with_token(token(1)).with_input(obj(json!({ "body": "x" })));
        let reply = ResourceHandler::new(&resource, &services, request).store().await;
        assert_eq!(reply.status().as_u16(), 422);
        assert!(reply.body()["data"]["title"].is_string());
        assert_eq!(resource.store().count().await, 0);
    }

    #[tokio::test]
    async fn update_checks_permissions_after_lookup() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts().writable_by("editors");
        seed(&resource).await;

        let request = ResourceRequest::new().with_token(token(2)).with_input(obj(json!({ "title": "x" })));
        let reply = ResourceHandler::new(&resource, &services, request).update(json!(1)).await;
        assert_eq!(reply.envelope().and_then(|e| e.message()), Some("insufficient_permissions"));

        let request = ResourceRequest::new().with_token(token(1)).with_input(obj(json!({ "title": "x" })));
        let reply = ResourceHandler::new(&resource, &services, request).update(json!(1)).await;
        assert_eq!(reply.envelope().and_then(|e| e.message()), Some("record updated"));
        assert_eq!(reply.body()["data"]["title"], json!("x"));
        assert_eq!(reply.body()["data"]["status"], json!("draft"));
    }

    #[tokio::test]
    async fn update_clears_missing_attachments() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts().with_attachments(AttachmentDeclaration::new().single("preview_image"));

        let request = ResourceRequest::new()
            .with_token(token(1))
            .with_input(obj(json!({ "title": "pic" })))
            .with_file("preview_image", UploadedFile::new("a.png", None, vec![1]));
        ResourceHandler::new(&resource, &services, request).store().await;
        assert_eq!(files.len().await, 1);

        let request = ResourceRequest::new().with_token(token(1)).with_input(obj(json!({ "title": "no pic" })));
        let reply = ResourceHandler::new(&resource, &services, request).update(json!(1)).await;
        assert!(reply.is_success());
        assert_eq!(files.deleted_count().await, 1);
        assert_eq!(reply.body()["data"]["preview_image"], json!([]));
    }

    #[tokio::test]
    async fn destroy_missing_record_never_deletes() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts();

        let request = ResourceRequest::new().with_token(token(1));
        let reply = ResourceHandler::new(&resource, &services, request).destroy(json!(42)).await;
        assert_eq!(reply.status().as_u16(), 403);
        assert_eq!(reply.envelope().and_then(|e| e.message()), Some("record_not_found"));
        assert_eq!(resource.store().delete_calls(), 0);
    }

    #[tokio::test]
    async fn destroy_removes_record() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts();
        seed(&resource).await;

        let request = ResourceRequest::new().with_token(token(1));
        let reply = ResourceHandler::new(&resource, &services, request).destroy(json!("2")).await;
        assert_eq!(reply.envelope().and_then(|e| e.message()), Some("record deleted"));
        assert_eq!(resource.store().count().await, 2);
    }

    #[tokio::test]
    async fn modern_status_codes() {
        let files = MemoryFileStore::new();
        let mut config = AppConfig::development();
        config.api.legacy_status_codes = false;
        let services = Services::new(config, Arc::new(users()), Arc::new(files.clone()));
        let resource = posts();

        let reply = ResourceHandler::new(&resource, &services, ResourceRequest::new()).check().await;
        assert_eq!(reply.status().as_u16(), 401);

        let reply = ResourceHandler::new(&resource, &services, ResourceRequest::new().with_token(token(1)))
            .show(json!(9))
            .await;
        assert_eq!(reply.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn check_and_backend_marker() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts();

        let mut handler = ResourceHandler::new(&resource, &services, ResourceRequest::new().with_token(token(1)));
        let body = handler.check().await.body();
        assert_eq!(body["data"]["group"][0]["code"], json!("editors"));
        assert!(!handler.is_backend().await);

        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-env", "backend".parse().unwrap());
        let request = ResourceRequest::new().with_token(token(1)).with_headers(headers.clone());
        assert!(ResourceHandler::new(&resource, &services, request).is_backend().await);

        let request = ResourceRequest::new().with_headers(headers);
        assert!(!ResourceHandler::new(&resource, &services, request).is_backend().await);
    }

    #[tokio::test]
    async fn csrf_token_verifies() {
        let files = MemoryFileStore::new();
        let services = services(&files);
        let resource = posts();

        let body = ResourceHandler::new(&resource, &services, ResourceRequest::new())
            .csrf_token()
            .body();
        let token = body["data"]["token"].as_str().unwrap();
        assert!(services.csrf.verify(token));
    }

    struct Stamp;

    impl Observer for Stamp {
        fn name(&self) -> &'static str {
            "stamp"
        }
    }

    #[async_trait]
    impl BeforeSaveObserver for Stamp {
        async fn execute(
            &self,
            ctx: &HookContext,
            _entity: &Entity,
            data: &mut Map<String, Value>,
        ) -> Result<(), ObserverError> {
            let author = ctx.user.as_ref().map(|u| u.id).unwrap_or_default();
            data.insert("author_id".into(), json!(author));
            Ok(())
        }
    }

    struct Locked;

    impl Observer for Locked {
        fn name(&self) -> &'static str {
            "locked"
        }
    }

    #[async_trait]
    impl BeforeDestroyObserver for Locked {
        async fn execute(&self, _ctx: &HookContext, _entity: &Entity) -> Result<(), ObserverError> {
            Err(ObserverError::SecurityError("record is locked".into()))
        }
    }

    #[tokio::test]
    async fn observers_rewrite_input_and_abort_destroy() {
        let files = MemoryFileStore::new();
        let mut bus = NotificationBus::new();
        bus.register_observer(ObserverBox::BeforeSave(Box::new(Stamp)));
        bus.register_observer(ObserverBox::BeforeDestroy(Box::new(Locked)));
        let services = services(&files).with_bus(bus);
        let resource = posts();

        let request = ResourceRequest::new().with_token(token(1)).with_input(obj(json!({ "title": "t" })));
        let reply = ResourceHandler::new(&resource, &services, request).store().await;
        assert_eq!(reply.body()["data"]["author_id"], json!(1));

        let request = ResourceRequest::new().with_token(token(1));
        let reply = ResourceHandler::new(&resource, &services, request).destroy(json!(1)).await;
        assert!(!reply.is_success());
        assert_eq!(resource.store().count().await, 1);
        assert_eq!(resource.store().delete_calls(), 0);
    }
}
