use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    db::{ReviewMutation, ReviewSnapshot, ReviewTxBody, Store, TxAttempt},
    errors::AppError,
    models::{Place, Review, redis::RedisKey},
};

#[derive(Debug, Default)]
struct MemoryState {
    places: HashMap<String, Place>,
    reviews: HashMap<(String, String), Review>,
    favorites: HashMap<String, BTreeSet<String>>,
    // Bumped on every write or delete of a key, absent keys included.
    versions: HashMap<String, u64>,
}

impl MemoryState {
    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn touch(&mut self, key: String) {
        *self.versions.entry(key).or_insert(0) += 1;
    }
}

/// Single-process store with the same optimistic commit rules as Redis
/// `WATCH`: the body runs outside the lock and the commit is rejected if a
/// watched key moved in between.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_place(&self, place: &Place) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if state.places.contains_key(&place.id) {
            return Err(AppError::InvalidInput(format!(
                "Place {} already exists",
                place.id
            )));
        }
        state.places.insert(place.id.clone(), place.clone());
        state.touch(RedisKey::place(&place.id));
        Ok(())
    }

    async fn get_place(&self, place_id: &str) -> Result<Option<Place>, AppError> {
        Ok(self.state.lock().await.places.get(place_id).cloned())
    }

    async fn list_places(&self) -> Result<Vec<Place>, AppError> {
        Ok(self.state.lock().await.places.values().cloned().collect())
    }

    async fn get_review(
        &self,
        place_id: &str,
        user_id: &str,
    ) -> Result<Option<Review>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .reviews
            .get(&(place_id.to_string(), user_id.to_string()))
            .cloned())
    }

    async fn list_reviews(&self, place_id: &str) -> Result<Vec<Review>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.place_id == place_id)
            .cloned()
            .collect())
    }

    async fn try_review_tx(
        &self,
        place_id: &str,
        user_id: &str,
        body: &ReviewTxBody<'_>,
    ) -> Result<TxAttempt, AppError> {
        let place_key = RedisKey::place(place_id);
        let review_key = RedisKey::review(place_id, user_id);
        let map_key = (place_id.to_string(), user_id.to_string());

        let (snapshot, watched) = {
            let state = self.state.lock().await;
            let place = state
                .places
                .get(place_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Place {place_id} not found")))?;
            let snapshot = ReviewSnapshot {
                place,
                review: state.reviews.get(&map_key).cloned(),
            };
            (
                snapshot,
                (state.version(&place_key), state.version(&review_key)),
            )
        };

        let mutation = body(&snapshot)?;
        let committed = mutation.committed_rating(&snapshot);

        // Give concurrent writers a window, as a network round trip would.
        tokio::task::yield_now().await;

        let mut state = self.state.lock().await;
        if (state.version(&place_key), state.version(&review_key)) != watched {
            return Ok(TxAttempt::Conflict);
        }

        match mutation {
            ReviewMutation::Put { review, rating } => {
                if let Some(place) = state.places.get_mut(place_id) {
                    place.rating = rating;
                }
                state.reviews.insert(map_key, review);
            }
            ReviewMutation::Delete { rating } => {
                if let Some(place) = state.places.get_mut(place_id) {
                    place.rating = rating;
                }
                state.reviews.remove(&map_key);
            }
            ReviewMutation::Unchanged => return Ok(TxAttempt::Committed(committed)),
        }
        state.touch(place_key);
        state.touch(review_key);

        Ok(TxAttempt::Committed(committed))
    }

    async fn set_favorite(
        &self,
        user_id: &str,
        place_id: &str,
        favorite: bool,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let set = state.favorites.entry(user_id.to_string()).or_default();
        if favorite {
            set.insert(place_id.to_string());
        } else {
            set.remove(place_id);
        }
        Ok(())
    }

    async fn list_favorite_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .favorites
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
