use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod media;
pub mod state;
pub mod users;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(CorsLayer::permissive())
        // Outermost, so the trace span can see the request ID
        .layer(middleware::from_fn(request_id_middleware))
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/media", get(media::list).post(media::create))
        .route("/media/search", get(media::search))
        .route("/media/top-rated", get(media::top_rated))
        .route("/media/:id", delete(media::remove))
        .route("/media/:id/reviews", get(media::reviews))
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", delete(users::remove))
        .route("/users/:id/reviews", post(users::submit_reviews))
        .route("/users/:id/favorites", post(users::add_favorite))
        .route("/users/:id/recommendations", get(users::recommendations))
        .route("/users/:id/alerts", get(users::alerts))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
