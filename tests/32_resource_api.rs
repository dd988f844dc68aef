mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use resource_api::attachment::ClearPolicy;
use serde_json::json;

#[tokio::test]
async fn show_returns_the_raw_resource() -> Result<()> {
    let app = common::app().await;
    let (status, body) = common::send(&app.router, common::request(Method::GET, "/api/posts/3", None, None)).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(3));
    assert_eq!(body["title"], json!("gamma"));
    assert!(body.get("success").is_none());
    Ok(())
}

#[tokio::test]
async fn show_missing_record_is_forbidden_in_legacy_mode() -> Result<()> {
    let app = common::app().await;
    let (status, body) = common::send(&app.router, common::request(Method::GET, "/api/posts/99", None, None)).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("record_not_found"));
    Ok(())
}

#[tokio::test]
async fn store_creates_a_record() -> Result<()> {
    let app = common::app().await;
    let token = common::token(1);
    let (status, body) = common::send(
        &app.router,
        common::request(Method::POST, "/api/posts", Some(&token), Some(json!({ "title": "zeta", "status": "draft" }))),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("record created"));
    assert_eq!(body["data"]["id"], json!(6));
    assert_eq!(app.store.count().await, 6);
    Ok(())
}

#[tokio::test]
async fn store_validates_input() -> Result<()> {
    let app = common::app().await;
    let token = common::token(1);
    let (status, body) = common::send(
        &app.router,
        common::request(
            Method::POST,
            "/api/posts",
            Some(&token),
            Some(json!({ "title": "a title that is far too long to pass" })),
        ),
    )
    .await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], json!("validation_failed"));
    assert!(body["data"]["title"].is_string());
    assert_eq!(app.store.count().await, 5);
    Ok(())
}

#[tokio::test]
async fn readers_cannot_write() -> Result<()> {
    let app = common::app().await;
    let token = common::token(2);
    let (status, body) = common::send(
        &app.router,
        common::request(Method::PUT, "/api/posts/1", Some(&token), Some(json!({ "title": "hijacked" }))),
    )
    .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("insufficient_permissions"));
    Ok(())
}

#[tokio::test]
async fn readers_cannot_destroy() -> Result<()> {
    let app = common::app().await;
    let token = common::token(2);
    let (status, body) =
        common::send(&app.router, common::request(Method::DELETE, "/api/posts/1", Some(&token), None)).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("insufficient_permissions"));
    assert_eq!(app.store.count().await, 5);
    assert_eq!(app.store.delete_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn update_of_missing_record_writes_nothing() -> Result<()> {
    let app = common::app().await;
    let token = common::token(1);
    let (status, body) = common::send(
        &app.router,
        common::request(Method::PUT, "/api/posts/99", Some(&token), Some(json!({ "title": "ghost" }))),
    )
    .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("record_not_found"));
    assert_eq!(app.store.count().await, 5);

    let (_, rows) = common::send(&app.router, common::request(Method::GET, "/api/posts/list", None, None)).await?;
    assert!(rows
        .as_array()
        .map(|rows| rows.iter().all(|r| r["title"] != json!("ghost")))
        .unwrap_or(false));
    Ok(())
}

#[tokio::test]
async fn update_via_put_and_post() -> Result<()> {
    let app = common::app().await;
    let token = common::token(1);

    let (_, body) = common::send(
        &app.router,
        common::request(Method::PUT, "/api/posts/2", Some(&token), Some(json!({ "status": "published" }))),
    )
    .await?;
    assert_eq!(body["message"], json!("record updated"));
    assert_eq!(body["data"]["status"], json!("published"));
    assert_eq!(body["data"]["title"], json!("beta"));

    let (_, body) = common::send(
        &app.router,
        common::request(Method::POST, "/api/posts/2", Some(&token), Some(json!({ "title": "beta2" }))),
    )
    .await?;
    assert_eq!(body["data"]["title"], json!("beta2"));
    Ok(())
}

#[tokio::test]
async fn destroy_removes_the_record() -> Result<()> {
    let app = common::app().await;
    let token = common::token(1);

    let (status, body) =
        common::send(&app.router, common::request(Method::DELETE, "/api/posts/4", Some(&token), None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("record deleted"));

    let (status, _) =
        common::send(&app.router, common::request(Method::DELETE, "/api/posts/4", Some(&token), None)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.delete_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn multipart_store_attaches_files() -> Result<()> {
    let app = common::app().await;
    let token = common::token(1);
    let request = common::multipart(
        "/api/posts",
        &token,
        &[("title", "with files")],
        &[
            ("preview_image", "cover.png", &b"png-bytes"[..]),
            ("images[]", "one.jpg", &b"one"[..]),
            ("images[]", "two.jpg", &b"two"[..]),
        ],
    );

    let (status, body) = common::send(&app.router, request).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["title"], json!("with files"));
    assert_eq!(body["data"]["preview_image"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["images"].as_array().map(Vec::len), Some(2));
    assert_eq!(app.files.len().await, 3);

    // Update without attachments clears them under the default policy
    let (_, body) = common::send(
        &app.router,
        common::request(Method::PUT, "/api/posts/6", Some(&token), Some(json!({ "title": "bare" }))),
    )
    .await?;
    assert_eq!(body["data"]["images"], json!([]));
    assert_eq!(app.files.deleted_count().await, 3);
    Ok(())
}

#[tokio::test]
async fn empty_file_input_keeps_existing_attachment() -> Result<()> {
    let mut config = common::config();
    config.attachments.clear_policy = ClearPolicy::Explicit;
    let app = common::app_with(config).await;
    let token = common::token(1);

    let created = common::multipart(
        "/api/posts",
        &token,
        &[("title", "cover")],
        &[("preview_image", "cover.png", &b"png-bytes"[..])],
    );
    let (status, body) = common::send(&app.router, created).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let untouched = common::multipart(
        "/api/posts/6",
        &token,
        &[("title", "cover again")],
        &[("preview_image", "", &b""[..])],
    );
    let (status, body) = common::send(&app.router, untouched).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["title"], json!("cover again"));
    assert_eq!(body["data"]["preview_image"][0]["file_name"], json!("cover.png"));
    assert_eq!(app.files.len().await, 1);
    assert_eq!(app.files.deleted_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_rejected() -> Result<()> {
    let app = common::app().await;
    let token = common::token(1);
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/posts")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))?;

    let (status, body) = common::send(&app.router, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("invalid_request"));
    Ok(())
}
