use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user ID
    pub exp: usize,  // expiration time
}

impl Claims {
    // The subject is used verbatim in store keys, so it must already be a valid key part.
    pub fn has_usable_subject(&self) -> bool {
        let sub = self.sub.as_str();
        !sub.is_empty() && sub.trim() == sub && !sub.contains(':')
    }
}
