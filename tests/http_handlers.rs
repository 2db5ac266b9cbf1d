use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use hidden_danang_be::{
    auth::AuthClaims,
    db::{MemoryStore, RetryPolicy, ReviewTxBody, Store, TxAttempt},
    errors::AppError,
    http::handlers::{
        add_favorite_handler, create_place_handler, delete_review_handler, get_favorites_handler,
        get_my_review_handler, get_place_handler, get_places_handler, get_reviews_handler,
        place::PlaceQuery, review::SubmitReviewPayload, submit_review_handler,
    },
    models::{Claims, NewPlace, Place, Review},
    state::AppState,
};

fn state() -> AppState {
    AppState::new(Arc::new(MemoryStore::new()), RetryPolicy::default())
}

fn as_user(user_id: &str) -> AuthClaims {
    AuthClaims(Claims {
        sub: user_id.to_string(),
        exp: usize::MAX,
    })
}

fn ba_na_hills() -> NewPlace {
    NewPlace {
        id: "ba-na-hills".into(),
        name: "Ba Na Hills".into(),
        category: "Attraction".into(),
        address: "Hoa Vang".into(),
        description: "Golden Bridge held by giant stone hands".into(),
        image_url: Some("https://example.com/golden-bridge.jpg".into()),
        latitude: 15.9977,
        longitude: 107.9881,
    }
}

async fn seeded_state() -> AppState {
    let state = state();
    let (status, _) = create_place_handler(State(state.clone()), Json(ba_na_hills()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    state
}

#[tokio::test]
async fn test_create_and_fetch_place() {
    let state = seeded_state().await;

    let Json(place) = get_place_handler(State(state.clone()), Path("ba-na-hills".into()))
        .await
        .unwrap();
    assert_eq!(place.name, "Ba Na Hills");
    assert_eq!(place.category, "attraction");
    assert_eq!(place.rating.count, 0);

    let Json(places) = get_places_handler(
        State(state.clone()),
        Query(PlaceQuery {
            category: Some("attraction".into()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(places.len(), 1);

    let err = create_place_handler(State(state), Json(ba_na_hills()))
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_place_is_404() {
    let state = state();
    let err = get_place_handler(State(state.clone()), Path("nope".into()))
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);

    let err = submit_review_handler(
        State(state),
        as_user("u1"),
        Path("nope".into()),
        Json(SubmitReviewPayload {
            rating: 4,
            comment: String::new(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_endpoints_return_fresh_summary() {
    let state = seeded_state().await;

    let Json(summary) = submit_review_handler(
        State(state.clone()),
        as_user("linh"),
        Path("ba-na-hills".into()),
        Json(SubmitReviewPayload {
            rating: 5,
            comment: "Cable car ride was unreal".into(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average, 5.0);

    let Json(summary) = submit_review_handler(
        State(state.clone()),
        as_user("minh"),
        Path("ba-na-hills".into()),
        Json(SubmitReviewPayload {
            rating: 2,
            comment: "Foggy all day".into(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.average, 3.5);

    let Json(mine) = get_my_review_handler(
        State(state.clone()),
        as_user("minh"),
        Path("ba-na-hills".into()),
    )
    .await
    .unwrap();
    assert_eq!(mine.rating, 2);

    let Json(summary) = delete_review_handler(
        State(state.clone()),
        as_user("minh"),
        Path("ba-na-hills".into()),
    )
    .await
    .unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average, 5.0);

    let err = get_my_review_handler(
        State(state.clone()),
        as_user("minh"),
        Path("ba-na-hills".into()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);

    let Json(reviews) = get_reviews_handler(State(state), Path("ba-na-hills".into()))
        .await
        .unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].user_id, "linh");
}

#[tokio::test]
async fn test_out_of_range_rating_is_bad_request() {
    let state = seeded_state().await;
    let err = submit_review_handler(
        State(state.clone()),
        as_user("linh"),
        Path("ba-na-hills".into()),
        Json(SubmitReviewPayload {
            rating: 9,
            comment: String::new(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);

    let Json(place) = get_place_handler(State(state), Path("ba-na-hills".into()))
        .await
        .unwrap();
    assert_eq!(place.rating.count, 0);
}

#[tokio::test]
async fn test_favorites_round_trip() {
    let state = seeded_state().await;

    let status = add_favorite_handler(
        State(state.clone()),
        as_user("linh"),
        Path("ba-na-hills".into()),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let err = add_favorite_handler(State(state.clone()), as_user("linh"), Path("nope".into()))
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);

    let Json(favorites) = get_favorites_handler(State(state.clone()), as_user("linh"))
        .await
        .unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, "ba-na-hills");

    let Json(favorites) = get_favorites_handler(State(state), as_user("minh"))
        .await
        .unwrap();
    assert!(favorites.is_empty());
}

// Reads of the place start failing as soon as a review write has committed.
struct ReadsFailAfterCommit {
    inner: MemoryStore,
    committed: AtomicBool,
}

#[async_trait]
impl Store for ReadsFailAfterCommit {
    async fn insert_place(&self, place: &Place) -> Result<(), AppError> {
        self.inner.insert_place(place).await
    }

    async fn get_place(&self, place_id: &str) -> Result<Option<Place>, AppError> {
        if self.committed.load(Ordering::SeqCst) {
            return Err(AppError::RedisPoolError("Redis connection timed out".into()));
        }
        self.inner.get_place(place_id).await
    }

    async fn list_places(&self) -> Result<Vec<Place>, AppError> {
        self.inner.list_places().await
    }

    async fn get_review(&self, place_id: &str, user_id: &str) -> Result<Option<Review>, AppError> {
        self.inner.get_review(place_id, user_id).await
    }

    async fn list_reviews(&self, place_id: &str) -> Result<Vec<Review>, AppError> {
        self.inner.list_reviews(place_id).await
    }

    async fn try_review_tx(
        &self,
        place_id: &str,
        user_id: &str,
        body: &ReviewTxBody<'_>,
    ) -> Result<TxAttempt, AppError> {
        let outcome = self.inner.try_review_tx(place_id, user_id, body).await?;
        if matches!(outcome, TxAttempt::Committed(_)) {
            self.committed.store(true, Ordering::SeqCst);
        }
        Ok(outcome)
    }

    async fn set_favorite(
        &self,
        user_id: &str,
        place_id: &str,
        favorite: bool,
    ) -> Result<(), AppError> {
        self.inner.set_favorite(user_id, place_id, favorite).await
    }

    async fn list_favorite_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        self.inner.list_favorite_ids(user_id).await
    }
}

#[tokio::test]
async fn test_committed_write_succeeds_when_later_reads_fail() {
    let inner = MemoryStore::new();
    inner
        .insert_place(&ba_na_hills().into_place().unwrap())
        .await
        .unwrap();
    let store = Arc::new(ReadsFailAfterCommit {
        inner: inner.clone(),
        committed: AtomicBool::new(false),
    });
    let state = AppState::new(store.clone(), RetryPolicy::default());

    let Json(summary) = submit_review_handler(
        State(state.clone()),
        as_user("linh"),
        Path("ba-na-hills".into()),
        Json(SubmitReviewPayload {
            rating: 4,
            comment: "Worth the queue".into(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average, 4.0);

    let Json(summary) = delete_review_handler(
        State(state.clone()),
        as_user("linh"),
        Path("ba-na-hills".into()),
    )
    .await
    .unwrap();
    assert_eq!(summary.count, 0);

    // The store really is failing reads at this point.
    let err = get_place_handler(State(state), Path("ba-na-hills".into()))
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);

    let place = inner.get_place("ba-na-hills").await.unwrap().unwrap();
    assert_eq!(place.rating.count, 0);
}
