use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store_backend: StoreBackend,
    pub mongo_uri: Option<String>,
    pub db_name: String,
    /// Upper bound on each store call made while ingesting a vote.
    pub store_timeout: Duration,
    /// Upper bound on a single push to one subscriber.
    pub delivery_timeout: Duration,
    pub subscriber_queue: usize,
    pub cors_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            store_backend: StoreBackend::Mongo,
            mongo_uri: None,
            db_name: "pollcast".to_string(),
            store_timeout: Duration::from_millis(5000),
            delivery_timeout: Duration::from_millis(2000),
            subscriber_queue: 64,
            cors_origin: None,
        }
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        let config = Self {
            port: try_load("PORT", "3000")?,
            store_backend: try_load("STORE_BACKEND", "mongo")?,
            mongo_uri: var("MONGO_URI"),
            db_name: try_load("DB_NAME", "pollcast")?,
            store_timeout: Duration::from_millis(try_load("STORE_TIMEOUT_MS", "5000")?),
            delivery_timeout: Duration::from_millis(try_load("DELIVERY_TIMEOUT_MS", "2000")?),
            subscriber_queue: try_load("SUBSCRIBER_QUEUE", "64")?,
            cors_origin: var("CORS_ORIGIN"),
        };

        if config.subscriber_queue == 0 {
            return Err(AppError::InternalError(
                "SUBSCRIBER_QUEUE must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> AppResult<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        AppError::InternalError(format!("Invalid {key} value '{raw}': {e}"))
    })
}
