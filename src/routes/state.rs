use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    db::{Cache, CatalogStore},
    services::{CatalogService, ReviewPipeline, UserService},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub catalog: CatalogService,
    pub reviews: ReviewPipeline,
    pub users: UserService,
}

impl AppState {
    /// Wires every service onto one store and one cache
    pub fn new(store: Arc<dyn CatalogStore>, cache: Cache, config: &Config) -> Self {
        Self {
            catalog: CatalogService::new(store.clone(), cache.clone()),
            reviews: ReviewPipeline::new(
                store.clone(),
                cache.clone(),
                Duration::from_secs(config.review_worker_timeout_secs),
            ),
            users: UserService::new(store.clone(), cache, config.credential_hash_cost),
            store,
        }
    }

    /// NotFound unless the user exists
    pub async fn require_user(&self, user_id: i64) -> crate::error::AppResult<()> {
        if self.store.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(crate::error::AppError::NotFound(format!(
                "No user found with ID {}",
                user_id
            )))
        }
    }
}
