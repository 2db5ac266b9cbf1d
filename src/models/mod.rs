pub mod place;
pub mod rating;
pub mod redis;
pub mod review;
pub mod user;

pub use place::{NewPlace, Place};
pub use rating::RatingSummary;
pub use review::{Review, ReviewInput};
pub use user::Claims;
