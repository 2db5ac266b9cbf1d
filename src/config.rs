use std::{env, fmt::Display, str::FromStr, time::Duration};

use crate::{db::RetryPolicy, errors::AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: StoreBackend,
    pub redis_url: Option<String>,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let backend: StoreBackend = try_load("STORE_BACKEND", "redis")?;
        let redis_url = env::var("REDIS_URL").ok();
        if backend == StoreBackend::Redis && redis_url.is_none() {
            return Err(AppError::EnvError(
                "REDIS_URL must be set for the redis backend".into(),
            ));
        }

        Ok(Self {
            port: try_load("PORT", "3001")?,
            backend,
            redis_url,
            retry: RetryPolicy {
                max_attempts: try_load("REVIEW_TX_MAX_ATTEMPTS", "10")?,
                base_backoff: Duration::from_millis(try_load("REVIEW_TX_BACKOFF_MS", "5")?),
                max_backoff: Duration::from_millis(try_load("REVIEW_TX_MAX_BACKOFF_MS", "200")?),
            },
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        tracing::info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| AppError::EnvError(format!("Invalid {key} value '{raw}': {e}")))
}
