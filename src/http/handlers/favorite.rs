use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{auth::AuthClaims, models::Place, state::AppState};

pub async fn get_favorites_handler(
    State(state): State<AppState>,
    auth: AuthClaims,
) -> Result<Json<Vec<Place>>, (StatusCode, String)> {
    let places = state.places.list_favorites(auth.user_id()).await.map_err(|err| {
        tracing::error!("Error listing favorites of {}: {}", auth.user_id(), err);
        err.to_response()
    })?;

    Ok(Json(places))
}

pub async fn add_favorite_handler(
    State(state): State<AppState>,
    auth: AuthClaims,
    Path(place_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .places
        .add_favorite(auth.user_id(), &place_id)
        .await
        .map_err(|err| {
            tracing::error!("Error adding favorite {}: {}", place_id, err);
            err.to_response()
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_favorite_handler(
    State(state): State<AppState>,
    auth: AuthClaims,
    Path(place_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .places
        .remove_favorite(auth.user_id(), &place_id)
        .await
        .map_err(|err| {
            tracing::error!("Error removing favorite {}: {}", place_id, err);
            err.to_response()
        })?;

    Ok(StatusCode::NO_CONTENT)
}
