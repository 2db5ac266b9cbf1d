use std::sync::Arc;

use crate::{
    db::{RetryPolicy, Store},
    places::PlaceService,
    reviews::RatingAggregator,
};

#[derive(Clone)]
pub struct AppState {
    pub places: PlaceService,
    pub reviews: RatingAggregator,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, retry: RetryPolicy) -> Self {
        Self {
            places: PlaceService::new(store.clone()),
            reviews: RatingAggregator::new(store, retry),
        }
    }
}
