use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

use crate::services::rates::http::DEFAULT_API_URL;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_RATES_TIMEOUT_SECS: u64 = 15;
const DEFAULT_RATES_CACHE_TTL_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct InvoicingConfig {
    pub common: core_config::Config,
    pub database: DatabaseConfig,
    pub exchange_rates: ExchangeRatesConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Unset outside production means the in-memory store is used.
    pub url: Option<Secret<String>>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct ExchangeRatesConfig {
    pub api_url: String,
    pub api_key: Option<Secret<String>>,
    /// Clamped to 10..=30 seconds.
    pub timeout: Duration,
    /// Clamped to 5..=15 minutes.
    pub cache_ttl: Duration,
}

impl InvoicingConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let database_url = if is_prod {
            Some(get_env("DATABASE_URL", None, is_prod)?)
        } else {
            get_optional_env("DATABASE_URL")
        };

        Ok(InvoicingConfig {
            common: common_config,
            database: DatabaseConfig {
                url: database_url.map(Secret::new),
                max_connections: get_env(
                    "DATABASE_MAX_CONNECTIONS",
                    Some(&DEFAULT_MAX_CONNECTIONS.to_string()),
                    false,
                )?
                .parse()
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            },
            exchange_rates: ExchangeRatesConfig {
                api_url: get_env("EXCHANGE_RATES_API_URL", Some(DEFAULT_API_URL), false)?,
                api_key: get_optional_env("EXCHANGE_RATES_API_KEY").map(Secret::new),
                timeout: clamped_secs(
                    "EXCHANGE_RATES_TIMEOUT_SECS",
                    DEFAULT_RATES_TIMEOUT_SECS,
                    10,
                    30,
                )?,
                cache_ttl: clamped_secs(
                    "EXCHANGE_RATES_CACHE_TTL_SECS",
                    DEFAULT_RATES_CACHE_TTL_SECS,
                    300,
                    900,
                )?,
            },
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
        })
    }
}

fn clamped_secs(key: &str, default: u64, min: u64, max: u64) -> Result<Duration, AppError> {
    let secs = get_env(key, Some(&default.to_string()), false)?
        .parse()
        .unwrap_or(default);
    Ok(Duration::from_secs(secs.clamp(min, max)))
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
