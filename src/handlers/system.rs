use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::Reply;
use crate::auth::CurrentUser;
use crate::controller::{session, Services};
use crate::request::ResourceRequest;

pub fn routes(services: Arc<Services>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/check", get(check))
        .route("/api/csrf-token", get(csrf_token))
        .with_state(services)
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now(),
        }
    }))
}

async fn check(State(services): State<Arc<Services>>, request: ResourceRequest) -> Reply {
    session::check(&mut CurrentUser::new(), &request, &services).await
}

async fn csrf_token(State(services): State<Arc<Services>>) -> Reply {
    session::csrf_token(&services)
}
