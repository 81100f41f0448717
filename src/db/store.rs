/// Persistent store abstraction
///
/// The service only talks to storage through these traits, so the Postgres
/// backend and the in-memory backend are interchangeable. Writes that must be
/// atomic go through a [`StoreTx`]; everything else is a single statement.
use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Alert, CatalogRow, Favorite, Media, MediaKind, NewReview, Review, TopRated, User},
};

/// Store handle shared by every service
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Opens a transaction. Dropping it without `commit` rolls it back.
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    async fn user_exists(&self, user_id: i64) -> AppResult<bool>;

    /// Inserts a user; `None` if the username is taken
    async fn insert_user(&self, username: &str, credential_hash: &str) -> AppResult<Option<User>>;

    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Deletes a user and everything they own. Returns rows affected.
    async fn delete_user(&self, user_id: i64) -> AppResult<u64>;

    async fn media_exists(&self, media_id: i64) -> AppResult<bool>;

    /// Inserts a media item; `None` if the title already exists
    async fn insert_media(&self, title: &str, kind: &MediaKind) -> AppResult<Option<Media>>;

    /// Deletes a media item with its reviews and favorites. Returns rows affected.
    async fn delete_media(&self, media_id: i64) -> AppResult<u64>;

    /// All media left-joined with reviews, grouped per media, ordered by id
    async fn catalog_rows(&self, limit: Option<i64>) -> AppResult<Vec<CatalogRow>>;

    /// Case-insensitive literal substring match on title
    async fn search_media(&self, query: &str) -> AppResult<Vec<Media>>;

    /// Reviewed media by average rating, highest first
    async fn top_rated(&self, limit: i64) -> AppResult<Vec<TopRated>>;

    async fn reviews_for_media(&self, media_id: i64) -> AppResult<Vec<Review>>;

    /// Distinct media the user has favorited
    async fn favorite_media(&self, user_id: i64) -> AppResult<Vec<Media>>;

    /// Inserts a favorite; `None` if the pair already existed
    async fn insert_favorite(&self, user_id: i64, media_id: i64) -> AppResult<Option<Favorite>>;

    /// Alerts for a recipient in insertion order
    async fn list_alerts(&self, user_id: i64) -> AppResult<Vec<Alert>>;
}

/// A unit of work against the store
#[async_trait]
pub trait StoreTx: Send {
    async fn media_exists(&mut self, media_id: i64) -> AppResult<bool>;

    async fn insert_review(&mut self, review: &NewReview) -> AppResult<Review>;

    /// Distinct users who favorited the media item
    async fn favorited_by(&mut self, media_id: i64) -> AppResult<Vec<i64>>;

    async fn insert_alert(&mut self, user_id: i64, message: &str) -> AppResult<Alert>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
