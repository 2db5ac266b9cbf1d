pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod http;
mod middleware;
pub mod models;
pub mod places;
pub mod reviews;
pub mod state;

use axum::{Router, middleware as axum_middleware};
use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use middleware::{cors_layer, create_global_rate_limiter, rate_limit_middleware};
use state::AppState;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;

use crate::{
    config::{Config, StoreBackend},
    db::{MemoryStore, RedisStore, Store},
    errors::AppError,
};

async fn build_store(config: &Config) -> Result<Arc<dyn Store>, AppError> {
    match config.backend {
        StoreBackend::Redis => {
            let redis_url = config
                .redis_url
                .clone()
                .ok_or_else(|| AppError::EnvError("REDIS_URL must be set".into()))?;
            let manager = RedisConnectionManager::new(redis_url)?;
            let pool = Pool::builder().build(manager).await?;
            tracing::info!("Using redis store");
            Ok(Arc::new(RedisStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let global_rate_limiter = create_global_rate_limiter();

    Router::new()
        .merge(http::create_http_routes(state))
        .layer(axum_middleware::from_fn(move |req, next| {
            rate_limit_middleware(global_rate_limiter.clone(), req, next)
        }))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .fallback(|| async { "404 Not Found" })
}

pub async fn start_server() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let store = build_store(&config).await?;
    let app = create_app(AppState::new(store, config.retry));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(|e| AppError::EnvError(format!("Failed to bind port {}: {}", config.port, e)))?;

    tracing::info!("Hidden Da Nang API listening on port {}", config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::EnvError(format!("Server error: {e}")))
}
