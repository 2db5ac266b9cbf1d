use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::AppError, models::rating::validate_rating};

pub const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub place_id: String,
    pub user_id: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_edited: bool,
}

impl Review {
    // Updates keep id and created_at of the review they replace.
    pub fn write(
        existing: Option<&Review>,
        input: &ReviewInput,
        now: DateTime<Utc>,
    ) -> Self {
        match existing {
            Some(old) => Self {
                id: old.id,
                place_id: old.place_id.clone(),
                user_id: old.user_id.clone(),
                rating: input.rating,
                comment: input.comment.clone(),
                created_at: old.created_at,
                updated_at: now,
                is_edited: true,
            },
            None => Self {
                id: Uuid::new_v4(),
                place_id: input.place_id.clone(),
                user_id: input.user_id.clone(),
                rating: input.rating,
                comment: input.comment.clone(),
                created_at: now,
                updated_at: now,
                is_edited: false,
            },
        }
    }
}

/// Validated submission. Building one never touches the store.
#[derive(Debug, Clone)]
pub struct ReviewInput {
    pub place_id: String,
    pub user_id: String,
    pub rating: u8,
    pub comment: String,
}

impl ReviewInput {
    pub fn new(
        place_id: &str,
        user_id: &str,
        rating: i64,
        comment: &str,
    ) -> Result<Self, AppError> {
        let (place_id, user_id) = validate_review_key(place_id, user_id)?;
        let rating = validate_rating(rating)?;

        let trimmed = comment.trim();
        if trimmed.chars().count() > MAX_COMMENT_CHARS {
            return Err(AppError::InvalidInput(format!(
                "Comment must be at most {MAX_COMMENT_CHARS} characters"
            )));
        }

        Ok(Self {
            place_id,
            user_id,
            rating,
            comment: html_escape::encode_text(trimmed).to_string(),
        })
    }
}

pub fn validate_review_key(place_id: &str, user_id: &str) -> Result<(String, String), AppError> {
    let place_id = place_id.trim();
    let user_id = user_id.trim();

    if place_id.is_empty() {
        return Err(AppError::InvalidInput("Missing place id".into()));
    }
    if user_id.is_empty() {
        return Err(AppError::InvalidInput("Missing user id".into()));
    }
    if place_id.contains(':') || user_id.contains(':') {
        return Err(AppError::InvalidInput("Ids must not contain ':'".into()));
    }

    Ok((place_id.to_string(), user_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn input_validation_happens_up_front() {
        assert!(matches!(
            ReviewInput::new("dragon-bridge", "u1", 7, "great"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            ReviewInput::new("", "u1", 4, "great"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            ReviewInput::new("dragon-bridge", "  ", 4, "great"),
            Err(AppError::InvalidInput(_))
        ));

        let long = "a".repeat(MAX_COMMENT_CHARS + 1);
        assert!(ReviewInput::new("dragon-bridge", "u1", 4, &long).is_err());
    }

    #[test]
    fn comment_is_trimmed_and_escaped() {
        let input = ReviewInput::new("dragon-bridge", "u1", 4, "  <b>fire show</b> ").unwrap();
        assert_eq!(input.comment, "&lt;b&gt;fire show&lt;/b&gt;");

        let empty = ReviewInput::new("dragon-bridge", "u1", 4, "").unwrap();
        assert_eq!(empty.comment, "");
    }

    #[test]
    fn rewrite_preserves_identity_and_creation_time() {
        let t0 = Utc::now();
        let input = ReviewInput::new("dragon-bridge", "u1", 5, "wow").unwrap();
        let first = Review::write(None, &input, t0);
        assert!(!first.is_edited);
        assert_eq!(first.created_at, first.updated_at);

        let later = t0 + Duration::minutes(10);
        let edit = ReviewInput::new("dragon-bridge", "u1", 2, "meh").unwrap();
        let second = Review::write(Some(&first), &edit, later);

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, t0);
        assert_eq!(second.updated_at, later);
        assert_eq!(second.rating, 2);
        assert!(second.is_edited);
    }
}
