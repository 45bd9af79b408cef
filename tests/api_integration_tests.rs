//! Integration Tests for API Endpoints
//!
//! Drives the full router: writes, cache clears and maintenance toggles
//! followed by the reads that must observe them.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{
        header::{CACHE_CONTROL, ETAG, PRAGMA, RETRY_AFTER},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use blog_freshness::{api::create_router, content::MemoryStore, AppState, Config};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), &Config::default());
    (store, create_router(state))
}

async fn body_to_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn send_json(app: &Router, method: &str, uri: &str, body: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn post_empty(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn delete(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn health_epoch(app: &Router) -> u64 {
    body_to_json(get(app, "/health").await).await["epoch"]
        .as_u64()
        .unwrap()
}

async fn create_post(app: &Router, slug: &str, category: &str, homepage: bool) -> Value {
    let body = format!(
        r#"{{"title":"Post {slug}","slug":"{slug}","category":"{category}","published":true,"show_on_homepage":{homepage}}}"#
    );
    let response = send_json(app, "POST", "/api/posts", &body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_to_json(response).await
}

fn cache_control(response: &Response) -> String {
    response.headers()[CACHE_CONTROL]
        .to_str()
        .unwrap()
        .to_string()
}

// == Publish Then Clear ==

#[tokio::test]
async fn test_publish_clear_then_homepage_shows_post() {
    let (_, app) = create_test_app();

    let before = body_to_json(get(&app, "/content?scope=homepage").await).await;
    assert_eq!(before["count"], 0);

    create_post(&app, "fresh", "Tech", true).await;
    let cleared = body_to_json(post_empty(&app, "/api/cache/clear").await).await;
    let clear_epoch = cleared["epoch"].as_u64().unwrap();

    let response = get(&app, "/content?scope=homepage").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cc = cache_control(&response);
    assert!(cc.contains("private"));
    assert!(cc.contains("no-store"));
    assert_eq!(response.headers()[PRAGMA], "no-cache");

    let json = body_to_json(response).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["items"][0]["slug"], "fresh");
    assert_eq!(json["policy"]["directive"], "PRIVATE_NO_STORE");
    assert!(json["epoch"].as_u64().unwrap() >= clear_epoch);
}

#[tokio::test]
async fn test_clear_on_empty_caches_succeeds() {
    let (_, app) = create_test_app();

    let first = body_to_json(post_empty(&app, "/api/cache/clear").await).await;
    let second = body_to_json(post_empty(&app, "/api/cache/clear").await).await;

    assert_eq!(first["success"], true);
    assert_eq!(first["dropped"], 0);
    assert!(second["epoch"].as_u64().unwrap() > first["epoch"].as_u64().unwrap());
}

// == Category Tokens ==

#[tokio::test]
async fn test_category_token_stable_until_mutation() {
    let (_, app) = create_test_app();
    create_post(&app, "one", "Tech", false).await;

    let uri = "/content?scope=category&category=Tech";
    let first = get(&app, uri).await;
    let second = get(&app, uri).await;
    assert_eq!(cache_control(&first), "public, max-age=300");
    assert_eq!(first.headers()[ETAG], second.headers()[ETAG]);

    create_post(&app, "two", "Tech", false).await;
    let third = get(&app, uri).await;
    assert_ne!(first.headers()[ETAG], third.headers()[ETAG]);

    let json = body_to_json(third).await;
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn test_category_feed_reflects_update_without_clear() {
    let (_, app) = create_test_app();
    let created = create_post(&app, "renamed", "Tech", false).await;
    let id = created["post"]["id"].as_u64().unwrap();

    let uri = "/content?scope=category&category=Tech";
    let json = body_to_json(get(&app, uri).await).await;
    assert_eq!(json["items"][0]["title"], "Post renamed");

    let response = send_json(
        &app,
        "PUT",
        &format!("/api/posts/{}", id),
        r#"{"title":"Brand new title"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(get(&app, uri).await).await;
    assert_eq!(json["items"][0]["title"], "Brand new title");
}

#[tokio::test]
async fn test_unpublished_post_only_in_admin_listing() {
    let (_, app) = create_test_app();
    send_json(
        &app,
        "POST",
        "/api/posts",
        r#"{"title":"Draft","slug":"draft","category":"Tech","show_on_homepage":true}"#,
    )
    .await;

    let public = body_to_json(get(&app, "/content?scope=homepage").await).await;
    assert_eq!(public["count"], 0);

    let response = get(&app, "/admin/content").await;
    assert!(cache_control(&response).contains("no-store"));
    let admin = body_to_json(response).await;
    assert_eq!(admin["count"], 1);
}

#[tokio::test]
async fn test_admin_category_read_is_never_shared() {
    let (_, app) = create_test_app();
    let response = get(&app, "/admin/content?scope=category&category=Tech").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cache_control(&response).contains("no-store"));
}

#[tokio::test]
async fn test_bust_token_bypasses_shared_caching() {
    let (_, app) = create_test_app();
    let response = get(&app, "/content?scope=category&category=Tech&bust=17").await;
    assert!(cache_control(&response).contains("no-store"));
}

#[tokio::test]
async fn test_unknown_scope_is_not_cacheable() {
    let (_, app) = create_test_app();
    let response = get(&app, "/content?scope=sidebar").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(cache_control(&response).contains("no-store"));
}

// == Maintenance ==

#[tokio::test]
async fn test_maintenance_message_is_always_current() {
    let (_, app) = create_test_app();

    send_json(
        &app,
        "POST",
        "/admin/settings",
        r#"{"maintenance_mode":true,"maintenance_message":"Back at noon"}"#,
    )
    .await;
    let response = get(&app, "/content?scope=homepage").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()[RETRY_AFTER], "120");
    assert_eq!(body_to_json(response).await["message"], "Back at noon");

    send_json(
        &app,
        "POST",
        "/admin/settings",
        r#"{"maintenance_message":"Back at one"}"#,
    )
    .await;
    let response = get(&app, "/content?scope=homepage").await;
    assert_eq!(body_to_json(response).await["message"], "Back at one");

    let status = body_to_json(get(&app, "/maintenance-status").await).await;
    assert_eq!(status["message"], "Back at one");
}

#[tokio::test]
async fn test_maintenance_exempt_routes_stay_reachable() {
    let (_, app) = create_test_app();
    send_json(&app, "POST", "/admin/settings", r#"{"maintenance_mode":true}"#).await;

    assert_eq!(get(&app, "/maintenance").await.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(get(&app, "/maintenance-status").await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/admin/settings").await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/health").await.status(), StatusCode::OK);
    assert_eq!(
        post_empty(&app, "/api/cache/clear").await.status(),
        StatusCode::OK
    );

    // A write during maintenance still lands
    create_post(&app, "during", "Tech", true).await;

    send_json(&app, "POST", "/admin/settings", r#"{"maintenance_mode":false}"#).await;
    let json = body_to_json(get(&app, "/content?scope=homepage").await).await;
    assert_eq!(json["count"], 1);
}

#[tokio::test]
async fn test_maintenance_page_without_maintenance() {
    let (_, app) = create_test_app();
    let response = get(&app, "/maintenance").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await["maintenance"], false);
}

#[tokio::test]
async fn test_gate_fails_open_on_store_outage() {
    let (store, app) = create_test_app();
    send_json(&app, "POST", "/admin/settings", r#"{"maintenance_mode":true}"#).await;

    store.set_available(false);
    let status = body_to_json(get(&app, "/maintenance-status").await).await;
    assert_eq!(status["maintenance"], false);

    let response = get(&app, "/content?scope=homepage").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.headers().get(RETRY_AFTER).is_none());
    let json = body_to_json(response).await;
    assert_eq!(json["retryable"], true);
    assert!(json["error"].as_str().unwrap().contains("try again"));
}

// == Mutations ==

#[tokio::test]
async fn test_rejected_write_does_not_bump() {
    let (_, app) = create_test_app();
    create_post(&app, "taken", "Tech", true).await;
    let before = body_to_json(get(&app, "/health").await).await["epoch"]
        .as_u64()
        .unwrap();

    let response = send_json(
        &app,
        "POST",
        "/api/posts",
        r#"{"title":"Again","slug":"taken","category":"Tech"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let after = body_to_json(get(&app, "/health").await).await["epoch"]
        .as_u64()
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_settings_write_bumps_even_without_maintenance_change() {
    let (_, app) = create_test_app();
    let before = body_to_json(get(&app, "/admin/settings").await).await["epoch"]
        .as_u64()
        .unwrap();

    let response = send_json(&app, "POST", "/admin/settings", r#"{"site_name":"Renamed"}"#).await;
    let json = body_to_json(response).await;

    assert_eq!(json["settings"]["site_name"], "Renamed");
    assert!(json["epoch"].as_u64().unwrap() > before);
}

#[tokio::test]
async fn test_category_lifecycle() {
    let (_, app) = create_test_app();
    let response = send_json(
        &app,
        "POST",
        "/api/categories",
        r#"{"name":"Tech","slug":"tech"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_to_json(response).await["category"]["id"].as_u64().unwrap();

    let post = create_post(&app, "aliased", "Tech", false).await;
    let json = body_to_json(get(&app, "/content?scope=category&category=tech").await).await;
    assert_eq!(json["count"], 1);

    // A category with posts filed under it stays, and nothing is invalidated
    let before = health_epoch(&app).await;
    let response = delete(&app, &format!("/api/categories/{}", id)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(cache_control(&response).contains("no-store"));
    let error = body_to_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("1 posts"));
    assert_eq!(health_epoch(&app).await, before);

    let post_id = post["post"]["id"].as_u64().unwrap();
    let response = delete(&app, &format!("/api/posts/{}", post_id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = delete(&app, &format!("/api/categories/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await["deleted"], id);
}

#[tokio::test]
async fn test_category_rename_changes_category_feed() {
    let (_, app) = create_test_app();
    let response = send_json(
        &app,
        "POST",
        "/api/categories",
        r#"{"name":"Tech","slug":"tech"}"#,
    )
    .await;
    let id = body_to_json(response).await["category"]["id"].as_u64().unwrap();
    create_post(&app, "renamed", "Tech", false).await;

    let uri = "/content?scope=category&category=tech";
    let first = get(&app, uri).await;
    let first_tag = first.headers()[ETAG].to_str().unwrap().to_string();
    assert_eq!(body_to_json(first).await["items"][0]["category"], "Tech");

    let response = send_json(
        &app,
        "PUT",
        &format!("/api/categories/{}", id),
        r#"{"name":"Technology"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cache_control(&response).contains("no-store"));
    let json = body_to_json(response).await;
    assert_eq!(json["category"]["name"], "Technology");
    let epoch = json["epoch"].as_u64().unwrap();

    let second = get(&app, uri).await;
    assert_ne!(second.headers()[ETAG].to_str().unwrap(), first_tag);
    let json = body_to_json(second).await;
    assert_eq!(json["epoch"].as_u64().unwrap(), epoch);
    assert_eq!(json["items"][0]["category"], "Technology");
}

#[tokio::test]
async fn test_category_update_conflict_does_not_bump() {
    let (_, app) = create_test_app();
    send_json(&app, "POST", "/api/categories", r#"{"name":"Tech","slug":"tech"}"#).await;
    let response = send_json(
        &app,
        "POST",
        "/api/categories",
        r#"{"name":"News","slug":"news"}"#,
    )
    .await;
    let id = body_to_json(response).await["category"]["id"].as_u64().unwrap();

    let before = health_epoch(&app).await;
    let response = send_json(
        &app,
        "PUT",
        &format!("/api/categories/{}", id),
        r#"{"slug":"tech"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(health_epoch(&app).await, before);

    let response = send_json(&app, "PUT", "/api/categories/999", r#"{"name":"Gone"}"#).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_single_item_read() {
    let (_, app) = create_test_app();
    create_post(&app, "solo", "Tech", false).await;

    let response = get(&app, "/content?scope=item&slug=solo").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_control(&response), "public, max-age=300");
    assert_eq!(body_to_json(response).await["items"][0]["slug"], "solo");
}
