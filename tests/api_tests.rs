use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use media_review::{
    config::Config,
    db::{Cache, MemoryCache, MemoryStore},
    routes::{create_router, AppState},
};

fn create_test_app() -> Router {
    let config = Config {
        credential_hash_cost: 4,
        ..Config::default()
    };
    let store = Arc::new(MemoryStore::new());
    let cache = Cache::new(Arc::new(MemoryCache::new()), config.cache_ttl_secs);
    create_router(Arc::new(AppState::new(store, cache, &config)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn add_media(app: &Router, title: &str, kind: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/media",
        Some(json!({ "title": title, "kind": kind })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn add_user(app: &Router, username: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/users",
        Some(json!({ "username": username, "credential": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_add_media_rules() {
    let app = create_test_app();
    add_media(&app, "Heat", "Movie").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/media",
        Some(json!({ "title": "Heat", "kind": "Movie" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Heat"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/media",
        Some(json!({ "title": "Podcast", "kind": "Podcast" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/v1/media", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["details"], "Movie: Heat");
    assert_eq!(body[0]["avg_rating"], "No Ratings");
}

#[tokio::test]
async fn test_review_batch_partial_failure() {
    let app = create_test_app();
    let user = add_user(&app, "alice").await;
    let media = add_media(&app, "Heat", "Movie").await;

    // Prime the listing cache before the write
    send(&app, "GET", "/api/v1/media", None).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/users/{}/reviews", user),
        Some(json!({ "reviews": [
            { "media_id": media, "rating": 4, "comment": "tense" },
            { "media_id": 999, "rating": 5 }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["submitted"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["outcomes"][0]["status"], "submitted");
    assert_eq!(body["outcomes"][1]["status"], "failed");

    let (_, listing) = send(&app, "GET", "/api/v1/media", None).await;
    assert_eq!(listing[0]["avg_rating"], 4.0);

    let uri = format!("/api/v1/media/{}/reviews", media);
    let (status, reviews) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews[0]["rating"], 4);
    assert_eq!(reviews[0]["comment"], "tense");
}

#[tokio::test]
async fn test_review_batch_rejected_up_front() {
    let app = create_test_app();
    let user = add_user(&app, "alice").await;
    let media = add_media(&app, "Heat", "Movie").await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/users/{}/reviews", user),
        Some(json!({ "reviews": [
            { "media_id": media, "rating": 3 },
            { "media_id": media, "rating": 6 }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/404/reviews",
        Some(json!({ "reviews": [{ "media_id": media, "rating": 3 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid user ID 404");

    let (_, reviews) = send(&app, "GET", &format!("/api/v1/media/{}/reviews", media), None).await;
    assert!(reviews.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_favorites_and_alerts() {
    let app = create_test_app();
    let fan = add_user(&app, "fan").await;
    let critic = add_user(&app, "critic").await;
    let media = add_media(&app, "Bluey", "Cartoon").await;

    let uri = format!("/api/v1/users/{}/favorites", fan);
    let (status, _) = send(&app, "POST", &uri, Some(json!({ "media_id": media }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", &uri, Some(json!({ "media_id": media }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_favorited"], true);

    send(
        &app,
        "POST",
        &format!("/api/v1/users/{}/reviews", critic),
        Some(json!({ "reviews": [{ "media_id": media, "rating": 5 }] })),
    )
    .await;

    let (status, alerts) = send(&app, "GET", &format!("/api/v1/users/{}/alerts", fan), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    assert_eq!(
        alerts[0]["message"],
        format!("User {} added a review for media ID {}.", critic, media)
    );

    let (_, recs) = send(
        &app,
        "GET",
        &format!("/api/v1/users/{}/recommendations", fan),
        None,
    )
    .await;
    assert_eq!(recs[0]["media"]["id"], media);
    assert_eq!(recs[0]["basis"], "favorites");
}

#[tokio::test]
async fn test_remove_media_and_users() {
    let app = create_test_app();
    let user = add_user(&app, "alice").await;
    let media = add_media(&app, "Heat", "Movie").await;

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/media/{}", media), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/api/v1/media/{}", media), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/users/{}", user), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, users) = send(&app, "GET", "/api/v1/users", None).await;
    assert!(users.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_users_never_expose_credentials() {
    let app = create_test_app();
    add_user(&app, "alice").await;
    let (_, users) = send(&app, "GET", "/api/v1/users", None).await;
    assert_eq!(users[0]["username"], "alice");
    assert!(users[0].get("credential").is_none());
}

#[tokio::test]
async fn test_query_parameter_validation() {
    let app = create_test_app();
    for uri in [
        "/api/v1/media?limit=0",
        "/api/v1/media?limit=-2",
        "/api/v1/media?limit=lots",
        "/api/v1/media/top-rated?n=0",
    ] {
        let (status, _) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_search_and_top_rated() {
    let app = create_test_app();
    let user = add_user(&app, "alice").await;
    let heat = add_media(&app, "Heat", "Movie").await;
    let song = add_media(&app, "Heat Waves", "Song").await;
    add_media(&app, "Bluey", "Cartoon").await;

    let (_, found) = send(&app, "GET", "/api/v1/media/search?q=heat", None).await;
    assert_eq!(found.as_array().unwrap().len(), 2);

    send(
        &app,
        "POST",
        &format!("/api/v1/users/{}/reviews", user),
        Some(json!({ "reviews": [
            { "media_id": heat, "rating": 3 },
            { "media_id": song, "rating": 5 }
        ]})),
    )
    .await;

    let (_, top) = send(&app, "GET", "/api/v1/media/top-rated?n=1", None).await;
    assert_eq!(top.as_array().unwrap().len(), 1);
    assert_eq!(top[0]["id"], song);
    assert_eq!(top[0]["avg_rating"], 5.0);
}
