use std::sync::Arc;

use crate::{
    db::{Cache, CacheKey, CatalogStore},
    error::{AppError, AppResult},
    models::{Favorite, User},
};

/// Outcome of favoriting a media item
#[derive(Debug, Clone, PartialEq)]
pub enum FavoriteOutcome {
    Added(Favorite),
    AlreadyFavorited,
}

/// User registration, removal, and favorites
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn CatalogStore>,
    cache: Cache,
    hash_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn CatalogStore>, cache: Cache, hash_cost: u32) -> Self {
        Self {
            store,
            cache,
            hash_cost,
        }
    }

    /// Registers a user. The credential is stored as a bcrypt hash.
    pub async fn add_user(&self, username: &str, credential: &str) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username must not be empty".to_string()));
        }
        if credential.is_empty() {
            return Err(AppError::Validation("Credential must not be empty".to_string()));
        }

        let credential = credential.to_string();
        let cost = self.hash_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(credential, cost))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

        let user = self
            .store
            .insert_user(username, &hash)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("Username '{}' is taken", username)))?;

        tracing::info!(user_id = user.id, username = %user.username, "User added");
        Ok(user)
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.store.list_users().await
    }

    /// Removes a user along with their reviews, favorites, and alerts
    pub async fn remove_user(&self, user_id: i64) -> AppResult<()> {
        if self.store.delete_user(user_id).await? == 0 {
            return Err(AppError::NotFound(format!("No user found with ID {}", user_id)));
        }

        // Their reviews are gone, so cached averages are stale
        self.cache.invalidate(&CacheKey::MediaList).await;
        tracing::info!(user_id, "User removed");
        Ok(())
    }

    /// Marks a media item as a favorite. Repeating it is not an error.
    pub async fn add_favorite(&self, user_id: i64, media_id: i64) -> AppResult<FavoriteOutcome> {
        if !self.store.user_exists(user_id).await? {
            return Err(AppError::NotFound(format!("No user found with ID {}", user_id)));
        }
        if !self.store.media_exists(media_id).await? {
            return Err(AppError::NotFound(format!("No media item found with ID {}", media_id)));
        }

        match self.store.insert_favorite(user_id, media_id).await? {
            Some(favorite) => {
                tracing::info!(user_id, media_id, "Favorite added");
                Ok(FavoriteOutcome::Added(favorite))
            }
            None => Ok(FavoriteOutcome::AlreadyFavorited),
        }
    }
}
