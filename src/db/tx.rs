use std::time::Duration;

use rand::Rng;

use crate::{
    db::{ReviewTxBody, Store, TxAttempt},
    errors::AppError,
    models::RatingSummary,
};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    // Exponential with full jitter on top.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_backoff
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_backoff);
        let jitter_ms = rand::rng().random_range(0..=exp.as_millis() as u64);
        exp + Duration::from_millis(jitter_ms)
    }
}

pub async fn run_review_transaction(
    store: &dyn Store,
    place_id: &str,
    user_id: &str,
    policy: &RetryPolicy,
    body: &ReviewTxBody<'_>,
) -> Result<RatingSummary, AppError> {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 0..max_attempts {
        match store.try_review_tx(place_id, user_id, body).await? {
            TxAttempt::Committed(rating) => {
                if attempt > 0 {
                    tracing::debug!(
                        "Review tx for {}/{} committed after {} retries",
                        place_id,
                        user_id,
                        attempt
                    );
                }
                return Ok(rating);
            }
            TxAttempt::Conflict => {
                tracing::debug!(
                    "Review tx conflict for {}/{} (attempt {}/{})",
                    place_id,
                    user_id,
                    attempt + 1,
                    max_attempts
                );
                if attempt + 1 < max_attempts {
                    tokio::time::sleep(policy.backoff(attempt)).await;
                }
            }
        }
    }

    tracing::warn!(
        "Review tx for {}/{} gave up after {} attempts",
        place_id,
        user_id,
        max_attempts
    );
    Err(AppError::WriteConflict(format!(
        "Place {place_id} is busy, please try again"
    )))
}
