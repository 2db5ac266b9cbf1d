use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Denormalized aggregate of every review left on a place.
///
/// Only the transitions below produce new summaries; handlers never build one
/// from client input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average: f64,
    pub count: u64,
    pub distribution: BTreeMap<u8, u64>,
}

pub fn validate_rating(rating: i64) -> Result<u8, AppError> {
    if rating < MIN_RATING as i64 || rating > MAX_RATING as i64 {
        return Err(AppError::InvalidInput(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )));
    }
    Ok(rating as u8)
}

// One decimal, truncated toward zero. Integer math so 4.1 never becomes 4.0.
pub fn truncate_one_decimal(total: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    ((total * 10) / count) as f64 / 10.0
}

impl RatingSummary {
    pub fn count_for(&self, star: u8) -> u64 {
        self.distribution.get(&star).copied().unwrap_or(0)
    }

    pub fn total_score(&self) -> u64 {
        self.distribution
            .iter()
            .map(|(star, n)| *star as u64 * n)
            .sum()
    }

    pub fn is_consistent(&self) -> bool {
        let distributed: u64 = self.distribution.values().sum();
        distributed == self.count
            && self.average == truncate_one_decimal(self.total_score(), self.count)
    }

    pub fn with_added(&self, star: u8) -> Self {
        let mut distribution = self.distribution.clone();
        *distribution.entry(star).or_insert(0) += 1;
        Self::from_parts(self.count + 1, distribution)
    }

    pub fn with_replaced(&self, old_star: u8, new_star: u8) -> Self {
        let mut distribution = self.distribution.clone();
        decrement(&mut distribution, old_star);
        *distribution.entry(new_star).or_insert(0) += 1;
        Self::from_parts(self.count, distribution)
    }

    pub fn with_removed(&self, star: u8) -> Self {
        let mut distribution = self.distribution.clone();
        decrement(&mut distribution, star);
        Self::from_parts(self.count.saturating_sub(1), distribution)
    }

    fn from_parts(count: u64, distribution: BTreeMap<u8, u64>) -> Self {
        let mut summary = Self {
            average: 0.0,
            count,
            distribution,
        };
        summary.average = truncate_one_decimal(summary.total_score(), summary.count);
        summary
    }

    pub fn to_redis_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("rating_average".to_string(), self.average.to_string()),
            ("rating_count".to_string(), self.count.to_string()),
        ];
        for star in MIN_RATING..=MAX_RATING {
            fields.push((format!("rating_{star}"), self.count_for(star).to_string()));
        }
        fields
    }

    // Stars that were never touched stay out of the map, matching a fresh place.
    pub fn from_redis_hash(map: &HashMap<String, String>) -> Result<Self, AppError> {
        let parse_count = |field: &str| -> Result<u64, AppError> {
            match map.get(field) {
                Some(v) => v
                    .parse()
                    .map_err(|_| AppError::Deserialization(format!("Invalid {field}"))),
                None => Ok(0),
            }
        };

        let mut distribution = BTreeMap::new();
        for star in MIN_RATING..=MAX_RATING {
            let field = format!("rating_{star}");
            if map.contains_key(&field) {
                distribution.insert(star, parse_count(&field)?);
            }
        }

        let average = match map.get("rating_average") {
            Some(v) => v
                .parse()
                .map_err(|_| AppError::Deserialization("Invalid rating_average".into()))?,
            None => 0.0,
        };

        Ok(Self {
            average,
            count: parse_count("rating_count")?,
            distribution,
        })
    }
}

fn decrement(distribution: &mut BTreeMap<u8, u64>, star: u8) {
    let entry = distribution.entry(star).or_insert(0);
    *entry = entry.saturating_sub(1);
}
