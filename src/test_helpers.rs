//! Test helpers shared by the unit test modules.
//!
//! `InstrumentedStore` wraps a [`MemoryStore`] and counts listing queries,
//! and can inject failures or delays into review transactions.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    db::{CatalogStore, MemoryStore, StoreTx},
    error::{AppError, AppResult},
    models::{
        Alert, CatalogRow, Favorite, Media, MediaKind, NewReview, Review, TopRated, User,
    },
};

#[derive(Default)]
struct Faults {
    failing_alert_media: HashSet<i64>,
    slow_review_media: HashSet<i64>,
    review_delay: Duration,
    catalog_read_delay: Option<Duration>,
    commit_delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct InstrumentedStore {
    pub inner: MemoryStore,
    catalog_queries: Arc<AtomicUsize>,
    faults: Arc<Mutex<Faults>>,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `catalog_rows` calls so far
    pub fn catalog_queries(&self) -> usize {
        self.catalog_queries.load(Ordering::SeqCst)
    }

    /// Alert inserts fail for reviews of this media item
    pub fn fail_alerts_for(&self, media_id: i64) {
        self.faults.lock().failing_alert_media.insert(media_id);
    }

    /// Review inserts for this media item stall for `delay`
    pub fn slow_reviews_for(&self, media_id: i64, delay: Duration) {
        let mut faults = self.faults.lock();
        faults.slow_review_media.insert(media_id);
        faults.review_delay = delay;
    }

    /// Listing reads return their rows only after `delay`
    pub fn slow_catalog_reads(&self, delay: Duration) {
        self.faults.lock().catalog_read_delay = Some(delay);
    }

    /// Every commit stalls for `delay` before applying
    pub fn slow_commits(&self, delay: Duration) {
        self.faults.lock().commit_delay = Some(delay);
    }
}

#[async_trait]
impl CatalogStore for InstrumentedStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(InstrumentedTx {
            inner,
            faults: self.faults.clone(),
        }))
    }

    async fn user_exists(&self, user_id: i64) -> AppResult<bool> {
        self.inner.user_exists(user_id).await
    }

    async fn insert_user(&self, username: &str, credential_hash: &str) -> AppResult<Option<User>> {
        self.inner.insert_user(username, credential_hash).await
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.inner.list_users().await
    }

    async fn delete_user(&self, user_id: i64) -> AppResult<u64> {
        self.inner.delete_user(user_id).await
    }

    async fn media_exists(&self, media_id: i64) -> AppResult<bool> {
        self.inner.media_exists(media_id).await
    }

    async fn insert_media(&self, title: &str, kind: &MediaKind) -> AppResult<Option<Media>> {
        self.inner.insert_media(title, kind).await
    }

    async fn delete_media(&self, media_id: i64) -> AppResult<u64> {
        self.inner.delete_media(media_id).await
    }

    async fn catalog_rows(&self, limit: Option<i64>) -> AppResult<Vec<CatalogRow>> {
        self.catalog_queries.fetch_add(1, Ordering::SeqCst);
        let rows = self.inner.catalog_rows(limit).await;
        let delay = self.faults.lock().catalog_read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        rows
    }

    async fn search_media(&self, query: &str) -> AppResult<Vec<Media>> {
        self.inner.search_media(query).await
    }

    async fn top_rated(&self, limit: i64) -> AppResult<Vec<TopRated>> {
        self.inner.top_rated(limit).await
    }

    async fn reviews_for_media(&self, media_id: i64) -> AppResult<Vec<Review>> {
        self.inner.reviews_for_media(media_id).await
    }

    async fn favorite_media(&self, user_id: i64) -> AppResult<Vec<Media>> {
        self.inner.favorite_media(user_id).await
    }

    async fn insert_favorite(&self, user_id: i64, media_id: i64) -> AppResult<Option<Favorite>> {
        self.inner.insert_favorite(user_id, media_id).await
    }

    async fn list_alerts(&self, user_id: i64) -> AppResult<Vec<Alert>> {
        self.inner.list_alerts(user_id).await
    }
}

struct InstrumentedTx {
    inner: Box<dyn StoreTx>,
    faults: Arc<Mutex<Faults>>,
}

#[async_trait]
impl StoreTx for InstrumentedTx {
    async fn media_exists(&mut self, media_id: i64) -> AppResult<bool> {
        self.inner.media_exists(media_id).await
    }

    async fn insert_review(&mut self, review: &NewReview) -> AppResult<Review> {
        let delay = {
            let faults = self.faults.lock();
            faults
                .slow_review_media
                .contains(&review.media_id)
                .then_some(faults.review_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.insert_review(review).await
    }

    async fn favorited_by(&mut self, media_id: i64) -> AppResult<Vec<i64>> {
        let fail = self.faults.lock().failing_alert_media.contains(&media_id);
        if fail {
            return Err(AppError::Internal(format!(
                "injected alert failure for media {}",
                media_id
            )));
        }
        self.inner.favorited_by(media_id).await
    }

    async fn insert_alert(&mut self, user_id: i64, message: &str) -> AppResult<Alert> {
        self.inner.insert_alert(user_id, message).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let delay = self.faults.lock().commit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.inner.rollback().await
    }
}

/// Creates `n` media items named `Title 1..=n` with the given kind
pub async fn seed_media(store: &dyn CatalogStore, n: usize, kind: MediaKind) -> Vec<Media> {
    let mut media = Vec::with_capacity(n);
    for i in 1..=n {
        let item = store
            .insert_media(&format!("Title {}", i), &kind)
            .await
            .unwrap()
            .unwrap();
        media.push(item);
    }
    media
}

pub async fn seed_user(store: &dyn CatalogStore, username: &str) -> User {
    store.insert_user(username, "hash").await.unwrap().unwrap()
}
