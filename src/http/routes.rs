use axum::{
    Router, middleware as axum_middleware,
    routing::{get, put},
};

use crate::{
    http::handlers::{
        add_favorite_handler, create_place_handler, delete_review_handler, get_favorites_handler,
        get_my_review_handler, get_place_handler, get_places_handler, get_reviews_handler,
        remove_favorite_handler, submit_review_handler,
    },
    middleware::{create_write_rate_limiter, rate_limit_middleware},
    state::AppState,
};

pub fn create_http_routes(state: AppState) -> Router {
    // Review and favorite writes get their own, stricter per-IP budget
    let write_rate_limiter = create_write_rate_limiter();
    let write_limit = axum_middleware::from_fn(move |req, next| {
        rate_limit_middleware(write_rate_limiter.clone(), req, next)
    });

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/places", get(get_places_handler).post(create_place_handler))
        .route("/places/{place_id}", get(get_place_handler))
        .route(
            "/places/{place_id}/reviews",
            get(get_reviews_handler).merge(
                put(submit_review_handler)
                    .delete(delete_review_handler)
                    .layer(write_limit.clone()),
            ),
        )
        .route("/places/{place_id}/reviews/me", get(get_my_review_handler))
        .route("/favorites", get(get_favorites_handler))
        .route(
            "/favorites/{place_id}",
            put(add_favorite_handler)
                .delete(remove_favorite_handler)
                .layer(write_limit),
        )
        .with_state(state)
}
