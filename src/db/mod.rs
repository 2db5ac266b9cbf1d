pub mod memory;
pub mod redis_store;
pub mod tx;

use async_trait::async_trait;

use crate::{
    errors::AppError,
    models::{Place, RatingSummary, Review},
};

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use tx::{RetryPolicy, run_review_transaction};

/// What a review transaction sees: the place and, if present, the caller's review.
#[derive(Debug, Clone)]
pub struct ReviewSnapshot {
    pub place: Place,
    pub review: Option<Review>,
}

#[derive(Debug, Clone)]
pub enum ReviewMutation {
    Put {
        review: Review,
        rating: RatingSummary,
    },
    Delete {
        rating: RatingSummary,
    },
    Unchanged,
}

impl ReviewMutation {
    // The summary the place holds once this mutation is committed.
    pub fn committed_rating(&self, snapshot: &ReviewSnapshot) -> RatingSummary {
        match self {
            ReviewMutation::Put { rating, .. } | ReviewMutation::Delete { rating } => {
                rating.clone()
            }
            ReviewMutation::Unchanged => snapshot.place.rating.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TxAttempt {
    Committed(RatingSummary),
    Conflict,
}

// Pure: may run several times for one logical transaction.
pub type ReviewTxBody<'a> =
    dyn Fn(&ReviewSnapshot) -> Result<ReviewMutation, AppError> + Send + Sync + 'a;

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_place(&self, place: &Place) -> Result<(), AppError>;

    async fn get_place(&self, place_id: &str) -> Result<Option<Place>, AppError>;

    async fn list_places(&self) -> Result<Vec<Place>, AppError>;

    async fn get_review(&self, place_id: &str, user_id: &str)
    -> Result<Option<Review>, AppError>;

    async fn list_reviews(&self, place_id: &str) -> Result<Vec<Review>, AppError>;

    /// One optimistic attempt: read the snapshot, run `body`, and commit its
    /// mutation only if neither the place nor the review changed meanwhile.
    /// A commit carries the summary that was written, or the one read when
    /// nothing had to change. A missing place fails with `NotFound` before
    /// `body` runs.
    async fn try_review_tx(
        &self,
        place_id: &str,
        user_id: &str,
        body: &ReviewTxBody<'_>,
    ) -> Result<TxAttempt, AppError>;

    async fn set_favorite(
        &self,
        user_id: &str,
        place_id: &str,
        favorite: bool,
    ) -> Result<(), AppError>;

    async fn list_favorite_ids(&self, user_id: &str) -> Result<Vec<String>, AppError>;
}
