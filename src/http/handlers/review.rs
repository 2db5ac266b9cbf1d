use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    auth::AuthClaims,
    errors::AppError,
    models::{RatingSummary, Review},
    state::AppState,
};

#[derive(Deserialize)]
pub struct SubmitReviewPayload {
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

pub async fn submit_review_handler(
    State(state): State<AppState>,
    auth: AuthClaims,
    Path(place_id): Path<String>,
    Json(payload): Json<SubmitReviewPayload>,
) -> Result<Json<RatingSummary>, (StatusCode, String)> {
    // Echo the committed summary so the client can redraw the rating bar.
    let summary = state
        .reviews
        .submit_or_update(&place_id, auth.user_id(), payload.rating, &payload.comment)
        .await
        .map_err(|err| {
            log_review_error("submitting", &place_id, &err);
            err.to_response()
        })?;

    Ok(Json(summary))
}

pub async fn delete_review_handler(
    State(state): State<AppState>,
    auth: AuthClaims,
    Path(place_id): Path<String>,
) -> Result<Json<RatingSummary>, (StatusCode, String)> {
    let summary = state
        .reviews
        .delete(&place_id, auth.user_id())
        .await
        .map_err(|err| {
            log_review_error("deleting", &place_id, &err);
            err.to_response()
        })?;

    Ok(Json(summary))
}

pub async fn get_reviews_handler(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> Result<Json<Vec<Review>>, (StatusCode, String)> {
    let reviews = state.reviews.list_reviews(&place_id).await.map_err(|err| {
        tracing::error!("Error listing reviews for {}: {}", place_id, err);
        err.to_response()
    })?;

    Ok(Json(reviews))
}

pub async fn get_my_review_handler(
    State(state): State<AppState>,
    auth: AuthClaims,
    Path(place_id): Path<String>,
) -> Result<Json<Review>, (StatusCode, String)> {
    let review = state
        .reviews
        .get_review(&place_id, auth.user_id())
        .await
        .map_err(|err| err.to_response())?;

    review
        .map(Json)
        .ok_or_else(|| AppError::NotFound("You have not reviewed this place".into()).to_response())
}

fn log_review_error(action: &str, place_id: &str, err: &AppError) {
    if err.is_backend_failure() {
        tracing::error!("Store failure {} review on {}: {}", action, place_id, err);
        return;
    }
    match err {
        AppError::InvalidInput(_) | AppError::NotFound(_) => {
            tracing::info!("Rejected review {} on {}: {}", action, place_id, err)
        }
        AppError::WriteConflict(_) => {
            tracing::warn!("Review {} on {} lost to contention: {}", action, place_id, err)
        }
        _ => tracing::error!("Error {} review on {}: {}", action, place_id, err),
    }
}
