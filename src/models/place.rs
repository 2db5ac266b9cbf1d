use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors::AppError, models::rating::RatingSummary};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    pub category: String,
    pub address: String,
    pub description: String,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlace {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewPlace {
    pub fn into_place(self) -> Result<Place, AppError> {
        let id = self.id.trim().to_lowercase();
        if !is_valid_place_id(&id) {
            return Err(AppError::InvalidInput(format!("Invalid place id: {}", self.id)));
        }

        let name = self.name.trim().to_string();
        if name.is_empty() || name.len() > 120 {
            return Err(AppError::InvalidInput("Invalid place name".into()));
        }

        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(AppError::InvalidInput("Coordinates out of range".into()));
        }

        Ok(Place {
            id,
            name,
            category: self.category.trim().to_lowercase(),
            address: self.address.trim().to_string(),
            description: self.description.trim().to_string(),
            image_url: self.image_url.filter(|u| !u.trim().is_empty()),
            latitude: self.latitude,
            longitude: self.longitude,
            rating: RatingSummary::default(),
            created_at: Utc::now(),
        })
    }
}

// Slugs end up inside store keys, so ':' and whitespace are out.
pub fn is_valid_place_id(id: &str) -> bool {
    let len_ok = (2..=64).contains(&id.len());
    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

    len_ok && valid_chars
}

impl Place {
    pub fn to_redis_hash(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("id".into(), self.id.clone());
        map.insert("name".into(), self.name.clone());
        map.insert("category".into(), self.category.clone());
        map.insert("address".into(), self.address.clone());
        map.insert("description".into(), self.description.clone());
        if let Some(ref url) = self.image_url {
            map.insert("image_url".into(), url.clone());
        }
        map.insert("latitude".into(), self.latitude.to_string());
        map.insert("longitude".into(), self.longitude.to_string());
        map.insert("created_at".into(), self.created_at.to_rfc3339());
        map.extend(self.rating.to_redis_fields());
        map
    }

    pub fn from_redis_hash(map: &HashMap<String, String>) -> Result<Self, AppError> {
        let text = |field: &str| -> Result<String, AppError> {
            map.get(field)
                .cloned()
                .ok_or_else(|| AppError::Deserialization(format!("Missing {field}")))
        };
        let coordinate = |field: &str| -> Result<f64, AppError> {
            text(field)?
                .parse()
                .map_err(|_| AppError::Deserialization(format!("Invalid {field}")))
        };

        Ok(Self {
            id: text("id")?,
            name: text("name")?,
            category: map.get("category").cloned().unwrap_or_default(),
            address: map.get("address").cloned().unwrap_or_default(),
            description: map.get("description").cloned().unwrap_or_default(),
            image_url: map.get("image_url").cloned(),
            latitude: coordinate("latitude")?,
            longitude: coordinate("longitude")?,
            rating: RatingSummary::from_redis_hash(map)?,
            created_at: DateTime::parse_from_rfc3339(&text("created_at")?)
                .map_err(|_| AppError::Deserialization("Invalid created_at".into()))?
                .with_timezone(&Utc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn my_khe() -> NewPlace {
        NewPlace {
            id: "My-Khe-Beach".into(),
            name: "  My Khe Beach ".into(),
            category: "Beach".into(),
            address: "Vo Nguyen Giap, Son Tra".into(),
            description: String::new(),
            image_url: Some("".into()),
            latitude: 16.0544,
            longitude: 108.2478,
        }
    }

    #[test]
    fn new_place_is_normalized_with_empty_summary() {
        let place = my_khe().into_place().unwrap();
        assert_eq!(place.id, "my-khe-beach");
        assert_eq!(place.name, "My Khe Beach");
        assert_eq!(place.category, "beach");
        assert_eq!(place.image_url, None);
        assert_eq!(place.rating, RatingSummary::default());
    }

    #[test]
    fn rejects_ids_that_would_break_keys() {
        assert!(!is_valid_place_id("marble:mountains"));
        assert!(!is_valid_place_id("han river"));
        assert!(!is_valid_place_id("x"));
        assert!(is_valid_place_id("marble-mountains"));

        let mut input = my_khe();
        input.latitude = 120.0;
        assert!(matches!(input.into_place(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn redis_hash_round_trip_keeps_summary() {
        let mut place = my_khe().into_place().unwrap();
        place.rating = RatingSummary::default().with_added(4);

        let parsed = Place::from_redis_hash(&place.to_redis_hash()).unwrap();
        assert_eq!(parsed.id, place.id);
        assert_eq!(parsed.rating.average, 4.0);
        assert_eq!(parsed.rating.count, 1);
        assert_eq!(parsed.created_at, place.created_at);
    }
}
