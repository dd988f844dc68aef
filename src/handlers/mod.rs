//! axum binding for resource controllers.
//!
//! Each controller is mounted under `/api/<name>`; the shared routes
//! (`/health`, `/api/auth/check`, `/api/csrf-token`) need no controller.

pub mod extract;
pub mod resource;
pub mod system;

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::controller::{ResourceController, Services};

/// Collects controllers into one router
pub struct ApiRouter {
    services: Arc<Services>,
    router: Router,
}

impl ApiRouter {
    pub fn new(services: Arc<Services>) -> Self {
        let router = system::routes(Arc::clone(&services));
        Self { services, router }
    }

    pub fn resource<C: ResourceController>(mut self, controller: C) -> Self {
        let routes = resource::routes(Arc::new(controller), Arc::clone(&self.services));
        self.router = self.router.merge(routes);
        self
    }

    /// Add the body limit, CORS and request tracing layers
    pub fn into_router(self) -> Router {
        let config = &self.services.config;
        let mut router = self
            .router
            .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));
        if config.security.enable_cors {
            router = router.layer(CorsLayer::permissive());
        }
        if config.api.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }
        router
    }
}
