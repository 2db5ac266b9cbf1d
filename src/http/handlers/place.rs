use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    models::{NewPlace, Place},
    state::AppState,
};

#[derive(Deserialize)]
pub struct PlaceQuery {
    pub category: Option<String>,
}

pub async fn create_place_handler(
    State(state): State<AppState>,
    Json(payload): Json<NewPlace>,
) -> Result<(StatusCode, Json<Place>), (StatusCode, String)> {
    let place = state.places.create_place(payload).await.map_err(|err| {
        tracing::error!("Error creating place: {}", err);
        err.to_response()
    })?;

    Ok((StatusCode::CREATED, Json(place)))
}

pub async fn get_place_handler(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> Result<Json<Place>, (StatusCode, String)> {
    let place = state.places.get_place(&place_id).await.map_err(|err| {
        tracing::error!("Error retrieving place {}: {}", place_id, err);
        err.to_response()
    })?;

    Ok(Json(place))
}

pub async fn get_places_handler(
    State(state): State<AppState>,
    Query(query): Query<PlaceQuery>,
) -> Result<Json<Vec<Place>>, (StatusCode, String)> {
    let places = state
        .places
        .list_places(query.category.as_deref())
        .await
        .map_err(|err| {
            tracing::error!("Error listing places: {}", err);
            err.to_response()
        })?;

    Ok(Json(places))
}
