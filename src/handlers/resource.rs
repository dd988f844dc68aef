use axum::{
    extract::{FromRef, Path, State},
    routing::get,
    Router,
};
use serde_json::Value;
use std::sync::Arc;

use crate::api::Reply;
use crate::controller::{ResourceController, ResourceHandler, Services};
use crate::request::ResourceRequest;

/// Router state for one mounted controller
pub struct ResourceState<C> {
    pub controller: Arc<C>,
    pub services: Arc<Services>,
}

impl<C> Clone for ResourceState<C> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            services: Arc::clone(&self.services),
        }
    }
}

impl<C> FromRef<ResourceState<C>> for Arc<Services> {
    fn from_ref(state: &ResourceState<C>) -> Self {
        Arc::clone(&state.services)
    }
}

impl<C: ResourceController> ResourceState<C> {
    fn handler(&self, request: ResourceRequest) -> ResourceHandler<'_, C> {
        ResourceHandler::new(&*self.controller, &self.services, request)
    }
}

/// `/api/<name>` routes for one controller:
///
/// - `GET /api/<name>` index (paginated)
/// - `GET /api/<name>/list` list (all rows)
/// - `POST /api/<name>` store
/// - `GET /api/<name>/:id` show
/// - `PUT|POST /api/<name>/:id` update
/// - `DELETE /api/<name>/:id` destroy
pub fn routes<C: ResourceController>(controller: Arc<C>, services: Arc<Services>) -> Router {
    let base = format!("/api/{}", controller.name());
    tracing::info!("Mounting resource at {}", base);

    Router::new()
        .route(&base, get(index::<C>).post(store::<C>))
        .route(&format!("{}/list", base), get(list::<C>))
        .route(
            &format!("{}/:id", base),
            get(show::<C>).put(update::<C>).post(update::<C>).delete(destroy::<C>),
        )
        .with_state(ResourceState { controller, services })
}

async fn index<C: ResourceController>(State(state): State<ResourceState<C>>, request: ResourceRequest) -> Reply {
    state.handler(request).index().await
}

async fn list<C: ResourceController>(State(state): State<ResourceState<C>>, request: ResourceRequest) -> Reply {
    state.handler(request).list().await
}

async fn show<C: ResourceController>(
    State(state): State<ResourceState<C>>,
    Path(id): Path<String>,
    request: ResourceRequest,
) -> Reply {
    state.handler(request).show(Value::String(id)).await
}

async fn store<C: ResourceController>(State(state): State<ResourceState<C>>, request: ResourceRequest) -> Reply {
    state.handler(request).store().await
}

async fn update<C: ResourceController>(
    State(state): State<ResourceState<C>>,
    Path(id): Path<String>,
    request: ResourceRequest,
) -> Reply {
    state.handler(request).update(Value::String(id)).await
}

async fn destroy<C: ResourceController>(
    State(state): State<ResourceState<C>>,
    Path(id): Path<String>,
    request: ResourceRequest,
) -> Reply {
    state.handler(request).destroy(Value::String(id)).await
}
