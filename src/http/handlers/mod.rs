pub mod favorite;
pub mod place;
pub mod review;

pub use favorite::{add_favorite_handler, get_favorites_handler, remove_favorite_handler};
pub use place::{create_place_handler, get_place_handler, get_places_handler};
pub use review::{
    delete_review_handler, get_my_review_handler, get_reviews_handler, submit_review_handler,
};
