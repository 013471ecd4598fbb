use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {key}")]
    Missing { key: &'static str },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    pub log_level: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing {
            key: "DATABASE_URL",
        })?;

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(10);

        let acquire_timeout = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(5));

        Ok(Self {
            database_url,
            log_level,
            max_connections,
            acquire_timeout,
        })
    }
}
