use crate::{
    db::{CatalogStore, StoreTx},
    error::AppResult,
    models::{Alert, Review},
};

/// The facts about a freshly written review that alerting needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSummary {
    pub review_id: i64,
    pub user_id: i64,
    pub media_id: i64,
}

impl From<&Review> for ReviewSummary {
    fn from(review: &Review) -> Self {
        Self {
            review_id: review.id,
            user_id: review.user_id,
            media_id: review.media_id,
        }
    }
}

pub fn alert_message(triggering_user_id: i64, media_id: i64) -> String {
    format!(
        "User {} added a review for media ID {}.",
        triggering_user_id, media_id
    )
}

/// Writes one alert per user who favorited the reviewed media, except the
/// reviewer, inside the review's transaction. Returns the recipients.
///
/// Nothing is deduplicated across reviews: two reviews of the same favorite
/// produce two alerts.
pub async fn derive_alerts(tx: &mut dyn StoreTx, review: &ReviewSummary) -> AppResult<Vec<i64>> {
    let recipients: Vec<i64> = tx
        .favorited_by(review.media_id)
        .await?
        .into_iter()
        .filter(|user_id| *user_id != review.user_id)
        .collect();

    let message = alert_message(review.user_id, review.media_id);
    for recipient in &recipients {
        tx.insert_alert(*recipient, &message).await?;
    }

    tracing::debug!(
        review_id = review.review_id,
        media_id = review.media_id,
        recipients = recipients.len(),
        "Derived alerts"
    );

    Ok(recipients)
}

/// All alerts for a user. Reading does not consume them.
pub async fn list_alerts(store: &dyn CatalogStore, user_id: i64) -> AppResult<Vec<Alert>> {
    store.list_alerts(user_id).await
}
