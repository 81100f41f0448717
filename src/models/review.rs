use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = AppError;

    fn try_from(value: i64) -> AppResult<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(AppError::Validation(format!(
                "Rating must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }
}

/// One item of a review batch, as submitted by a client
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSubmission {
    pub media_id: i64,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ReviewSubmission {
    pub fn new(media_id: i64, rating: i64, comment: Option<&str>) -> Self {
        Self {
            media_id,
            rating,
            comment: comment.map(str::to_string),
        }
    }
}

/// Review row ready for insertion
#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: i64,
    pub media_id: i64,
    pub rating: Rating,
    pub comment: Option<String>,
}

/// A persisted review. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub media_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one item in a review batch
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    /// Position of the item in the submitted batch
    pub index: usize,
    pub media_id: i64,
    #[serde(flatten)]
    pub result: ItemResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemResult {
    Submitted {
        review_id: i64,
        alerted_users: Vec<i64>,
    },
    Failed {
        error: String,
    },
}

impl ReviewOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self.result, ItemResult::Submitted { .. })
    }
}

/// Per-item results of one `submit_reviews` call, in submission order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub user_id: i64,
    pub submitted: usize,
    pub failed: usize,
    pub outcomes: Vec<ReviewOutcome>,
}

impl BatchReport {
    pub fn new(user_id: i64, mut outcomes: Vec<ReviewOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.index);
        let submitted = outcomes.iter().filter(|o| o.is_submitted()).count();
        Self {
            user_id,
            submitted,
            failed: outcomes.len() - submitted,
            outcomes,
        }
    }
}
