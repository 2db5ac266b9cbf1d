use std::sync::Arc;

use chrono::Utc;

use crate::{
    db::{ReviewMutation, ReviewSnapshot, RetryPolicy, Store, run_review_transaction},
    errors::AppError,
    models::{RatingSummary, Review, ReviewInput, review::validate_review_key},
};

/// Keeps `Place.rating` in step with the place's reviews without scanning them.
///
/// Every write runs as one optimistic transaction over the place and the
/// caller's review; conflicts are retried according to the [`RetryPolicy`].
#[derive(Clone)]
pub struct RatingAggregator {
    store: Arc<dyn Store>,
    retry: RetryPolicy,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn Store>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub async fn submit_or_update(
        &self,
        place_id: &str,
        user_id: &str,
        rating: i64,
        comment: &str,
    ) -> Result<RatingSummary, AppError> {
        let input = ReviewInput::new(place_id, user_id, rating, comment)?;

        let body = |snapshot: &ReviewSnapshot| -> Result<ReviewMutation, AppError> {
            Ok(apply_submission(snapshot, &input))
        };

        let summary = run_review_transaction(
            self.store.as_ref(),
            &input.place_id,
            &input.user_id,
            &self.retry,
            &body,
        )
        .await?;

        tracing::info!(
            "Review by {} on {} saved with rating {}",
            input.user_id,
            input.place_id,
            input.rating
        );
        Ok(summary)
    }

    // Deleting a review that does not exist succeeds without writing and
    // returns the summary as read.
    pub async fn delete(&self, place_id: &str, user_id: &str) -> Result<RatingSummary, AppError> {
        let (place_id, user_id) = validate_review_key(place_id, user_id)?;

        let body = |snapshot: &ReviewSnapshot| -> Result<ReviewMutation, AppError> {
            Ok(apply_deletion(snapshot))
        };

        let summary =
            run_review_transaction(self.store.as_ref(), &place_id, &user_id, &self.retry, &body)
                .await?;

        tracing::info!("Review by {} on {} deleted", user_id, place_id);
        Ok(summary)
    }

    pub async fn get_review(
        &self,
        place_id: &str,
        user_id: &str,
    ) -> Result<Option<Review>, AppError> {
        let (place_id, user_id) = validate_review_key(place_id, user_id)?;
        self.store.get_review(&place_id, &user_id).await
    }

    pub async fn list_reviews(&self, place_id: &str) -> Result<Vec<Review>, AppError> {
        if self.store.get_place(place_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Place {place_id} not found")));
        }

        let mut reviews = self.store.list_reviews(place_id).await?;
        reviews.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(reviews)
    }

    pub async fn get_summary(&self, place_id: &str) -> Result<RatingSummary, AppError> {
        self.store
            .get_place(place_id)
            .await?
            .map(|place| place.rating)
            .ok_or_else(|| AppError::NotFound(format!("Place {place_id} not found")))
    }
}

fn apply_submission(snapshot: &ReviewSnapshot, input: &ReviewInput) -> ReviewMutation {
    let current = &snapshot.place.rating;
    let rating = match snapshot.review {
        Some(ref old) => current.with_replaced(old.rating, input.rating),
        None => current.with_added(input.rating),
    };

    ReviewMutation::Put {
        review: Review::write(snapshot.review.as_ref(), input, Utc::now()),
        rating,
    }
}

fn apply_deletion(snapshot: &ReviewSnapshot) -> ReviewMutation {
    match snapshot.review {
        Some(ref old) => ReviewMutation::Delete {
            rating: snapshot.place.rating.with_removed(old.rating),
        },
        None => ReviewMutation::Unchanged,
    }
}
