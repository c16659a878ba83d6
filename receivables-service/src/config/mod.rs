//! Configuration module for receivables-service.

use crate::import::normalize::NumberLocale;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct ReceivablesConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Tuning knobs for the import pipeline. Batch size and delay bound request
/// size against the store; neither is a correctness concern.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub number_locale: Option<NumberLocale>,
    pub upcoming_days: i64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_delay_ms: 150,
            number_locale: None,
            upcoming_days: 15,
        }
    }
}

impl ReceivablesConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "receivables-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            import: ImportConfig {
                batch_size: env::var("IMPORT_BATCH_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|&n| n > 0)
                    .unwrap_or(50),
                batch_delay_ms: env::var("IMPORT_BATCH_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(150),
                number_locale: env::var("IMPORT_NUMBER_LOCALE")
                    .ok()
                    .as_deref()
                    .and_then(NumberLocale::from_str),
                upcoming_days: env::var("IMPORT_UPCOMING_DAYS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            },
        })
    }
}
