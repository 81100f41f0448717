use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, ListLimit, Media, Review, TopRated},
    services::catalog::DEFAULT_TOP_RATED,
};

#[derive(Debug, Deserialize)]
pub struct CreateMedia {
    title: String,
    kind: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
pub struct TopRatedQuery {
    n: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateMedia>,
) -> AppResult<(StatusCode, Json<Media>)> {
    let media = state.catalog.add_media(&body.title, &body.kind).await?;
    Ok((StatusCode::CREATED, Json(media)))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(media_id): Path<i64>,
) -> AppResult<StatusCode> {
    state.catalog.remove_media(media_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `?limit=all` (default) or `?limit=N`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Vec<CatalogEntry>>> {
    let limit = match params.limit.as_deref() {
        Some(raw) => raw.parse::<ListLimit>()?,
        None => ListLimit::All,
    };
    Ok(Json(state.catalog.list_catalog(limit).await?))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Media>>> {
    Ok(Json(state.catalog.search_catalog(&params.q).await?))
}

pub async fn top_rated(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopRatedQuery>,
) -> AppResult<Json<Vec<TopRated>>> {
    let n = match params.n.as_deref() {
        Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
            AppError::Validation(format!("n must be a positive integer, got '{}'", raw))
        })?,
        None => DEFAULT_TOP_RATED,
    };
    Ok(Json(state.catalog.top_rated(n).await?))
}

pub async fn reviews(
    State(state): State<Arc<AppState>>,
    Path(media_id): Path<i64>,
) -> AppResult<Json<Vec<Review>>> {
    Ok(Json(state.catalog.reviews_for_media(media_id).await?))
}
