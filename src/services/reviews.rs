use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::{
    db::{Cache, CacheKey, CatalogStore, StoreTx},
    error::{AppError, AppResult},
    models::{
        BatchReport, ItemResult, NewReview, Rating, Review, ReviewOutcome, ReviewSubmission,
    },
    services::alerts::{self, ReviewSummary},
};

/// Review ingestion pipeline
///
/// A batch belongs to one acting user. The batch is checked as a whole first
/// (user exists, every rating in range) and rejected before any write if that
/// fails. Each item then runs as its own task and its own transaction: insert
/// the review, write alerts for interested users, commit. One item failing
/// never rolls back or blocks the others.
#[derive(Clone)]
pub struct ReviewPipeline {
    store: Arc<dyn CatalogStore>,
    cache: Cache,
    worker_timeout: Duration,
}

impl ReviewPipeline {
    pub fn new(store: Arc<dyn CatalogStore>, cache: Cache, worker_timeout: Duration) -> Self {
        Self {
            store,
            cache,
            worker_timeout,
        }
    }

    /// Submits a batch of reviews and waits for every item to finish
    pub async fn submit_reviews(
        &self,
        user_id: i64,
        items: Vec<ReviewSubmission>,
    ) -> AppResult<BatchReport> {
        if items.is_empty() {
            return Err(AppError::Validation(
                "Must provide at least one review".to_string(),
            ));
        }

        let reviews = items
            .into_iter()
            .map(|item| {
                Ok(NewReview {
                    user_id,
                    media_id: item.media_id,
                    rating: Rating::try_from(item.rating)?,
                    comment: normalize_comment(item.comment),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        if !self.store.user_exists(user_id).await? {
            tracing::warn!(user_id, "Review submission for unknown user");
            return Err(AppError::InvalidUser(user_id));
        }

        tracing::info!(user_id, item_count = reviews.len(), "Submitting review batch");

        let mut tasks = Vec::with_capacity(reviews.len());

        // One task per item
        for (index, review) in reviews.into_iter().enumerate() {
            let store = self.store.clone();
            let cache = self.cache.clone();
            let deadline = self.worker_timeout;
            let media_id = review.media_id;

            let task = tokio::spawn(async move {
                let result = ingest_review(store.as_ref(), &review, deadline).await;
                if result.is_ok() {
                    cache.invalidate(&CacheKey::MediaList).await;
                }
                result
            });
            tasks.push((index, media_id, task));
        }

        // Join all before reporting
        let mut outcomes = Vec::with_capacity(tasks.len());
        for (index, media_id, task) in tasks {
            let result = match task.await {
                Ok(Ok((review, alerted_users))) => ItemResult::Submitted {
                    review_id: review.id,
                    alerted_users,
                },
                Ok(Err(e)) => {
                    tracing::warn!(user_id, media_id, error = %e, "Review item failed");
                    ItemResult::Failed {
                        error: e.to_string(),
                    }
                }
                Err(e) => {
                    tracing::error!(user_id, media_id, error = %e, "Review task join error");
                    ItemResult::Failed {
                        error: AppError::Internal(e.to_string()).to_string(),
                    }
                }
            };
            outcomes.push(ReviewOutcome {
                index,
                media_id,
                result,
            });
        }

        let report = BatchReport::new(user_id, outcomes);

        if report.failed > 0 {
            tracing::warn!(
                user_id,
                success_count = report.submitted,
                error_count = report.failed,
                "Partial review batch failure"
            );
        } else {
            tracing::info!(user_id, submitted = report.submitted, "Review batch submitted");
        }

        Ok(report)
    }
}

fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Runs one item in its own transaction, committing only if every step succeeded
///
/// The deadline covers opening the transaction and the writes. The commit
/// runs outside it, so a reported timeout always means nothing was committed.
async fn ingest_review(
    store: &dyn CatalogStore,
    review: &NewReview,
    deadline: Duration,
) -> AppResult<(Review, Vec<i64>)> {
    let expires_at = Instant::now() + deadline;
    let timed_out = || {
        AppError::Timeout(format!(
            "review for media {} exceeded {}s",
            review.media_id,
            deadline.as_secs_f64()
        ))
    };

    let mut tx = timeout_at(expires_at, store.begin())
        .await
        .map_err(|_| timed_out())??;

    let outcome = timeout_at(expires_at, write_review(tx.as_mut(), review)).await;
    let written = match outcome {
        Ok(Ok(written)) => written,
        Ok(Err(e)) => return Err(rollback(tx, e).await),
        Err(_) => return Err(rollback(tx, timed_out()).await),
    };

    tx.commit().await?;
    Ok(written)
}

async fn rollback(tx: Box<dyn StoreTx>, cause: AppError) -> AppError {
    if let Err(rollback_err) = tx.rollback().await {
        tracing::error!(error = %rollback_err, "Rollback failed");
    }
    cause
}

async fn write_review(tx: &mut dyn StoreTx, review: &NewReview) -> AppResult<(Review, Vec<i64>)> {
    if !tx.media_exists(review.media_id).await? {
        return Err(AppError::NotFound(format!("media {}", review.media_id)));
    }

    let stored = tx.insert_review(review).await?;
    let recipients = alerts::derive_alerts(tx, &ReviewSummary::from(&stored)).await?;
    Ok((stored, recipients))
}
