use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    db::store::{CatalogStore, StoreTx},
    error::{AppError, AppResult},
    models::{
        round2, Alert, CatalogRow, Favorite, Media, MediaKind, NewReview, Review, TopRated, User,
    },
};

#[derive(Default)]
struct Sequences {
    user: i64,
    media: i64,
    review: i64,
    favorite: i64,
    alert: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Default)]
struct MemoryState {
    seq: Sequences,
    users: BTreeMap<i64, (User, String)>,
    media: BTreeMap<i64, Media>,
    reviews: Vec<Review>,
    favorites: Vec<Favorite>,
    alerts: Vec<Alert>,
}

impl MemoryState {
    fn average_ratings(&self) -> HashMap<i64, f64> {
        let mut sums: HashMap<i64, (i64, i64)> = HashMap::new();
        for review in &self.reviews {
            let entry = sums.entry(review.media_id).or_default();
            entry.0 += i64::from(review.rating);
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(id, (sum, count))| (id, sum as f64 / count as f64))
            .collect()
    }
}

/// Store that keeps every table in process memory
///
/// Mirrors the canonical schema: unique usernames and titles, unique
/// favorite pairs, and cascading deletes from users and media. Clones share
/// the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credential hash stored for a user
    pub fn credential_of(&self, user_id: i64) -> Option<String> {
        self.state
            .lock()
            .users
            .get(&user_id)
            .map(|(_, credential)| credential.clone())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        Ok(Box::new(MemoryTx {
            state: self.state.clone(),
            reviews: Vec::new(),
            alerts: Vec::new(),
        }))
    }

    async fn user_exists(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.state.lock().users.contains_key(&user_id))
    }

    async fn insert_user(&self, username: &str, credential_hash: &str) -> AppResult<Option<User>> {
        let mut state = self.state.lock();
        if state.users.values().any(|(u, _)| u.username == username) {
            return Ok(None);
        }
        let user = User {
            id: next(&mut state.seq.user),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        state
            .users
            .insert(user.id, (user.clone(), credential_hash.to_string()));
        Ok(Some(user))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self
            .state
            .lock()
            .users
            .values()
            .map(|(user, _)| user.clone())
            .collect())
    }

    async fn delete_user(&self, user_id: i64) -> AppResult<u64> {
        let mut state = self.state.lock();
        if state.users.remove(&user_id).is_none() {
            return Ok(0);
        }
        state.reviews.retain(|r| r.user_id != user_id);
        state.favorites.retain(|f| f.user_id != user_id);
        state.alerts.retain(|a| a.user_id != user_id);
        Ok(1)
    }

    async fn media_exists(&self, media_id: i64) -> AppResult<bool> {
        Ok(self.state.lock().media.contains_key(&media_id))
    }

    async fn insert_media(&self, title: &str, kind: &MediaKind) -> AppResult<Option<Media>> {
        let mut state = self.state.lock();
        if state.media.values().any(|m| m.title == title) {
            return Ok(None);
        }
        let media = Media {
            id: next(&mut state.seq.media),
            title: title.to_string(),
            kind: kind.clone(),
        };
        state.media.insert(media.id, media.clone());
        Ok(Some(media))
    }

    async fn delete_media(&self, media_id: i64) -> AppResult<u64> {
        let mut state = self.state.lock();
        if state.media.remove(&media_id).is_none() {
            return Ok(0);
        }
        state.reviews.retain(|r| r.media_id != media_id);
        state.favorites.retain(|f| f.media_id != media_id);
        Ok(1)
    }

    async fn catalog_rows(&self, limit: Option<i64>) -> AppResult<Vec<CatalogRow>> {
        let state = self.state.lock();
        let averages = state.average_ratings();
        let take = limit.map_or(usize::MAX, |n| n.max(0) as usize);

        Ok(state
            .media
            .values()
            .take(take)
            .map(|m| CatalogRow {
                id: m.id,
                title: m.title.clone(),
                kind: m.kind.clone(),
                avg_rating: averages.get(&m.id).copied(),
            })
            .collect())
    }

    async fn search_media(&self, query: &str) -> AppResult<Vec<Media>> {
        let needle = query.to_lowercase();
        Ok(self
            .state
            .lock()
            .media
            .values()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn top_rated(&self, limit: i64) -> AppResult<Vec<TopRated>> {
        let state = self.state.lock();
        let averages = state.average_ratings();

        let mut ranked: Vec<(&Media, f64)> = state
            .media
            .values()
            .filter_map(|m| averages.get(&m.id).map(|avg| (m, *avg)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.id.cmp(&b.0.id)));

        Ok(ranked
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(m, avg)| TopRated {
                id: m.id,
                title: m.title.clone(),
                kind: m.kind.clone(),
                avg_rating: round2(avg),
            })
            .collect())
    }

    async fn reviews_for_media(&self, media_id: i64) -> AppResult<Vec<Review>> {
        Ok(self
            .state
            .lock()
            .reviews
            .iter()
            .filter(|r| r.media_id == media_id)
            .cloned()
            .collect())
    }

    async fn favorite_media(&self, user_id: i64) -> AppResult<Vec<Media>> {
        let state = self.state.lock();
        let ids: BTreeSet<i64> = state
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.media_id)
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| state.media.get(&id).cloned())
            .collect())
    }

    async fn insert_favorite(&self, user_id: i64, media_id: i64) -> AppResult<Option<Favorite>> {
        let mut state = self.state.lock();
        if !state.users.contains_key(&user_id) || !state.media.contains_key(&media_id) {
            return Err(AppError::NotFound(format!(
                "user {} or media {}",
                user_id, media_id
            )));
        }
        if state
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.media_id == media_id)
        {
            return Ok(None);
        }
        let favorite = Favorite {
            id: next(&mut state.seq.favorite),
            user_id,
            media_id,
            created_at: Utc::now(),
        };
        state.favorites.push(favorite.clone());
        Ok(Some(favorite))
    }

    async fn list_alerts(&self, user_id: i64) -> AppResult<Vec<Alert>> {
        Ok(self
            .state
            .lock()
            .alerts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Buffers writes until commit. Ids are drawn eagerly, so rolled-back
/// inserts leave gaps the way a database sequence does.
struct MemoryTx {
    state: Arc<Mutex<MemoryState>>,
    reviews: Vec<Review>,
    alerts: Vec<Alert>,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn media_exists(&mut self, media_id: i64) -> AppResult<bool> {
        Ok(self.state.lock().media.contains_key(&media_id))
    }

    async fn insert_review(&mut self, review: &NewReview) -> AppResult<Review> {
        let id = next(&mut self.state.lock().seq.review);
        let review = Review {
            id,
            user_id: review.user_id,
            media_id: review.media_id,
            rating: i32::from(review.rating.get()),
            comment: review.comment.clone(),
            created_at: Utc::now(),
        };
        self.reviews.push(review.clone());
        Ok(review)
    }

    async fn favorited_by(&mut self, media_id: i64) -> AppResult<Vec<i64>> {
        let users: BTreeSet<i64> = self
            .state
            .lock()
            .favorites
            .iter()
            .filter(|f| f.media_id == media_id)
            .map(|f| f.user_id)
            .collect();
        Ok(users.into_iter().collect())
    }

    async fn insert_alert(&mut self, user_id: i64, message: &str) -> AppResult<Alert> {
        let id = next(&mut self.state.lock().seq.alert);
        let alert = Alert {
            id,
            user_id,
            message: message.to_string(),
            created_at: Utc::now(),
        };
        self.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx {
            state: shared,
            reviews,
            alerts,
        } = *self;
        let mut state = shared.lock();

        // Foreign keys are checked at commit, as a deferred constraint would be
        for review in &reviews {
            if !state.users.contains_key(&review.user_id) {
                return Err(AppError::NotFound(format!("user {}", review.user_id)));
            }
            if !state.media.contains_key(&review.media_id) {
                return Err(AppError::NotFound(format!("media {}", review.media_id)));
            }
        }
        if let Some(alert) = alerts.iter().find(|a| !state.users.contains_key(&a.user_id)) {
            return Err(AppError::NotFound(format!("user {}", alert.user_id)));
        }

        state.reviews.extend(reviews);
        state.alerts.extend(alerts);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
