#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use resource_api::auth::{issue_token, Claims};
use resource_api::config::AppConfig;
use resource_api::controller::Services;
use resource_api::filter::SortDirection;
use resource_api::handlers::ApiRouter;
use resource_api::memory::{MemoryEntityStore, MemoryFileStore, MemoryResource, MemoryUserDirectory};
use resource_api::store::{FieldRules, Group, User};

pub const SECRET: &str = "integration-secret";
pub const BOUNDARY: &str = "XBOUNDARYX";

pub struct TestApp {
    pub router: Router,
    pub store: MemoryEntityStore,
    pub files: MemoryFileStore,
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = SECRET.to_string();
    config.api.enable_request_logging = false;
    config
}

pub fn users() -> MemoryUserDirectory {
    MemoryUserDirectory::new()
        .with_user(User {
            id: 1,
            name: "Editor".into(),
            email: Some("editor@example.com".into()),
            groups: vec![Group {
                id: 10,
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
        .with_inactive_user(User {
            id: 3,
            name: "Banned".into(),
            email: None,
            groups: vec![],
        })
}

/// `posts` resource seeded with five rows, writable by editors
pub async fn app_with(config: AppConfig) -> TestApp {
    let store = MemoryEntityStore::new("posts").with_relations(["preview_image", "images"]);
    for (title, status, rank) in [
        ("alpha", "published", 3),
        ("beta", "draft", 1),
        ("gamma", "published", 5),
        ("delta", "published", 2),
        ("epsilon", "draft", 4),
    ] {
        store.insert(json!({ "title": title, "status": status, "rank": rank })).await;
    }

    let files = MemoryFileStore::new();
    let posts = MemoryResource::new(store.clone())
        .with_sort("id", SortDirection::Asc)
        .with_per_page(2)
        .filter_on("status")
        .with_rules(FieldRules::new().rule("title", "required|string|max:20"))
        .writable_by("editors");

    let services = Services::new(config, Arc::new(users()), Arc::new(files.clone()));
    let router = ApiRouter::new(Arc::new(services)).resource(posts).into_router();
    TestApp { router, store, files }
}

pub async fn app() -> TestApp {
    app_with(config()).await
}

pub fn token(user_id: i64) -> String {
    issue_token(&Claims::new(user_id, 1), SECRET).expect("token")
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

/// Multipart body with text fields and `(field, file name, bytes)` files
pub fn multipart(uri: &str, token: &str, fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .expect("request")
}

pub async fn send(router: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}
