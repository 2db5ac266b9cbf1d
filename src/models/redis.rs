pub struct RedisKey;

impl RedisKey {
    pub fn place(place_id: &str) -> String {
        format!("place:{place_id}")
    }

    pub fn places() -> String {
        "places".to_string()
    }

    pub fn review(place_id: &str, user_id: &str) -> String {
        format!("review:{place_id}:{user_id}")
    }

    pub fn place_reviewers(place_id: &str) -> String {
        format!("place:{place_id}:reviewers")
    }

    pub fn favorites(user_id: &str) -> String {
        format!("user:{user_id}:favorites")
    }
}
