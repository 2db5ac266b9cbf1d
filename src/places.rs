use std::sync::Arc;

use crate::{
    db::Store,
    errors::AppError,
    models::{NewPlace, Place, place::is_valid_place_id},
};

#[derive(Clone)]
pub struct PlaceService {
    store: Arc<dyn Store>,
}

impl PlaceService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_place(&self, input: NewPlace) -> Result<Place, AppError> {
        let place = input.into_place()?;
        self.store.insert_place(&place).await?;
        Ok(place)
    }

    pub async fn get_place(&self, place_id: &str) -> Result<Place, AppError> {
        self.store
            .get_place(place_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Place {place_id} not found")))
    }

    // Best rated first; ties broken by name so the order is stable.
    pub async fn list_places(&self, category: Option<&str>) -> Result<Vec<Place>, AppError> {
        let category = category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty());

        let mut places: Vec<Place> = self
            .store
            .list_places()
            .await?
            .into_iter()
            .filter(|p| category.as_ref().is_none_or(|c| &p.category == c))
            .collect();

        places.sort_by(|a, b| {
            b.rating
                .average
                .partial_cmp(&a.rating.average)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(places)
    }

    pub async fn add_favorite(&self, user_id: &str, place_id: &str) -> Result<(), AppError> {
        self.get_place(place_id).await?;
        self.store.set_favorite(user_id, place_id, true).await?;
        tracing::info!("User {} favorited {}", user_id, place_id);
        Ok(())
    }

    pub async fn remove_favorite(&self, user_id: &str, place_id: &str) -> Result<(), AppError> {
        if !is_valid_place_id(place_id) {
            return Err(AppError::InvalidInput(format!("Invalid place id: {place_id}")));
        }
        self.store.set_favorite(user_id, place_id, false).await
    }

    pub async fn list_favorites(&self, user_id: &str) -> Result<Vec<Place>, AppError> {
        let ids = self.store.list_favorite_ids(user_id).await?;

        let mut places = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_place(&id).await? {
                Some(place) => places.push(place),
                None => tracing::debug!("Favorite {} of {} no longer resolves", id, user_id),
            }
        }

        Ok(places)
    }
}
