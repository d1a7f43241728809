use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub dispatch_radius_m: f64,
    pub delivery_code_ttl_secs: i64,
    pub broadcast_ttl_secs: i64,
    pub expiry_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dispatch_radius_m: parse_or_default("DISPATCH_RADIUS_M", 5000.0)?,
            delivery_code_ttl_secs: parse_or_default("DELIVERY_CODE_TTL_SECS", 300)?,
            // 0 keeps broadcasts alive until accepted or re-triggered
            broadcast_ttl_secs: parse_or_default("BROADCAST_TTL_SECS", 0)?,
            expiry_sweep_secs: parse_or_default("EXPIRY_SWEEP_SECS", 30)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

/// Runtime knobs the dispatch engine reads on every operation.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub radius_m: f64,
    pub code_ttl: chrono::Duration,
    pub broadcast_ttl: Option<chrono::Duration>,
}

impl DispatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            radius_m: config.dispatch_radius_m,
            code_ttl: chrono::Duration::seconds(config.delivery_code_ttl_secs),
            broadcast_ttl: (config.broadcast_ttl_secs > 0)
                .then(|| chrono::Duration::seconds(config.broadcast_ttl_secs)),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            radius_m: 5000.0,
            code_ttl: chrono::Duration::minutes(5),
            broadcast_ttl: None,
        }
    }
}
