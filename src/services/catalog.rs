use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    cached,
    db::{Cache, CacheKey, CatalogStore},
    error::{AppError, AppResult},
    models::{
        CatalogEntry, ListLimit, Media, MediaKind, Recommendation, RecommendationBasis, Review,
        TopRated,
    },
};

/// Number of items in the top-rated fallback for recommendations
pub const DEFAULT_TOP_RATED: u32 = 5;

/// Read side of the catalog, plus media maintenance
///
/// Only the unbounded listing goes through the cache; it is invalidated on
/// every catalog or review write so readers see fresh averages, and expires
/// on its TTL otherwise.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    cache: Cache,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, cache: Cache) -> Self {
        Self { store, cache }
    }

    /// Adds a media item. Titles are unique.
    pub async fn add_media(&self, title: &str, kind: &str) -> AppResult<Media> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        let kind = MediaKind::from_input(kind)?;

        let media = self
            .store
            .insert_media(title, &kind)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("Media item '{}' already exists", title)))?;

        self.cache.invalidate(&CacheKey::MediaList).await;
        tracing::info!(
            media_id = media.id,
            title = %media.title,
            kind = %media.kind,
            "Media added"
        );
        Ok(media)
    }

    pub async fn remove_media(&self, media_id: i64) -> AppResult<()> {
        if self.store.delete_media(media_id).await? == 0 {
            return Err(AppError::NotFound(format!("No media item found with ID {}", media_id)));
        }

        self.cache.invalidate(&CacheKey::MediaList).await;
        tracing::info!(media_id, "Media removed");
        Ok(())
    }

    /// Catalog listing with average ratings
    pub async fn list_catalog(&self, limit: ListLimit) -> AppResult<Vec<CatalogEntry>> {
        match limit {
            ListLimit::All => cached!(self.cache, CacheKey::MediaList, self.load_catalog(limit)),
            ListLimit::Count(_) => self.load_catalog(limit).await,
        }
    }

    async fn load_catalog(&self, limit: ListLimit) -> AppResult<Vec<CatalogEntry>> {
        let rows = self.store.catalog_rows(limit.as_sql_limit()).await?;
        tracing::debug!(rows = rows.len(), "Loaded catalog from store");
        Ok(rows.into_iter().map(CatalogEntry::from).collect())
    }

    pub async fn search_catalog(&self, query: &str) -> AppResult<Vec<Media>> {
        self.store.search_media(query).await
    }

    pub async fn top_rated(&self, n: u32) -> AppResult<Vec<TopRated>> {
        if n == 0 {
            return Err(AppError::Validation(
                "Top-rated count must be positive".to_string(),
            ));
        }
        self.store.top_rated(i64::from(n)).await
    }

    pub async fn reviews_for_media(&self, media_id: i64) -> AppResult<Vec<Review>> {
        if !self.store.media_exists(media_id).await? {
            return Err(AppError::NotFound(format!("No media item found with ID {}", media_id)));
        }
        self.store.reviews_for_media(media_id).await
    }

    /// One random favorite per kind the user has favorited; top-rated media
    /// when the user has no favorites. Empty when neither exists.
    pub async fn recommend(&self, user_id: i64) -> AppResult<Vec<Recommendation>> {
        let favorites = self.store.favorite_media(user_id).await?;

        if favorites.is_empty() {
            let top = self.store.top_rated(i64::from(DEFAULT_TOP_RATED)).await?;
            return Ok(top
                .into_iter()
                .map(|t| Recommendation {
                    user_id,
                    media: Media::from(t),
                    basis: RecommendationBasis::TopRated,
                    generated_by_system: true,
                })
                .collect());
        }

        let picks = pick_one_per_kind(favorites, &mut rand::thread_rng());
        Ok(picks
            .into_iter()
            .map(|media| Recommendation {
                user_id,
                media,
                basis: RecommendationBasis::Favorites,
                generated_by_system: true,
            })
            .collect())
    }
}

/// Groups media by kind and picks one uniformly at random from each group.
/// Output is ordered by kind name.
fn pick_one_per_kind<R: rand::Rng + ?Sized>(media: Vec<Media>, rng: &mut R) -> Vec<Media> {
    let mut by_kind: BTreeMap<String, Vec<Media>> = BTreeMap::new();
    for item in media {
        by_kind
            .entry(item.kind.as_str().to_string())
            .or_default()
            .push(item);
    }

    by_kind
        .into_values()
        .filter_map(|group| group.choose(rng).cloned())
        .collect()
}
