use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppState;
use crate::{
    error::AppResult,
    models::{Alert, BatchReport, Recommendation, ReviewSubmission, User},
    services::{alerts, FavoriteOutcome},
};

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    username: String,
    credential: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBatch {
    reviews: Vec<ReviewSubmission>,
}

#[derive(Debug, Deserialize)]
pub struct AddFavorite {
    media_id: i64,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.users.add_user(&body.username, &body.credential).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.list_users().await?))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<StatusCode> {
    state.users.remove_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Per-item outcomes; partial failure still answers 200
pub async fn submit_reviews(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(body): Json<ReviewBatch>,
) -> AppResult<Json<BatchReport>> {
    Ok(Json(state.reviews.submit_reviews(user_id, body.reviews).await?))
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(body): Json<AddFavorite>,
) -> AppResult<(StatusCode, Json<Value>)> {
    match state.users.add_favorite(user_id, body.media_id).await? {
        FavoriteOutcome::Added(favorite) => Ok((StatusCode::CREATED, Json(json!(favorite)))),
        FavoriteOutcome::AlreadyFavorited => Ok((
            StatusCode::OK,
            Json(json!({
                "user_id": user_id,
                "media_id": body.media_id,
                "already_favorited": true,
            })),
        )),
    }
}

pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<Recommendation>>> {
    state.require_user(user_id).await?;
    Ok(Json(state.catalog.recommend(user_id).await?))
}

pub async fn alerts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<Alert>>> {
    state.require_user(user_id).await?;
    Ok(Json(alerts::list_alerts(state.store.as_ref(), user_id).await?))
}
