use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::lifecycle::LifecycleSettings;
use crate::utils::RetryConfig;

// ============================================================================
// Application Configuration
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Scylla,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "scylla" | "scylladb" => Ok(StoreBackend::Scylla),
            other => Err(format!("unknown backend '{}', expected memory or scylla", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub metrics_port: u16,

    pub store_backend: StoreBackend,
    pub scylla_nodes: Vec<String>,
    pub scylla_keyspace: String,

    pub business_utc_offset_hours: i32,
    pub store_timeout: Duration,
    pub history_retry_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env file if present

        let config = Self::from_lookup(|name| env::var(name).ok())?;
        tracing::info!(
            backend = ?config.store_backend,
            port = config.server_port,
            "Application configuration loaded"
        );
        Ok(config)
    }

    /// Build from any variable source; unset variables take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let business_utc_offset_hours: i32 = parse(&lookup, "BUSINESS_UTC_OFFSET_HOURS", "7")?;
        if !(-12..=14).contains(&business_utc_offset_hours) {
            return Err(ConfigError::Invalid {
                name: "BUSINESS_UTC_OFFSET_HOURS",
                reason: format!("{} is outside -12..=14", business_utc_offset_hours),
            });
        }

        let scylla_nodes: Vec<String> = get("SCYLLA_NODES", "127.0.0.1:9042")
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            server_host: get("SERVER_HOST", "127.0.0.1"),
            server_port: parse(&lookup, "SERVER_PORT", "5000")?,
            metrics_port: parse(&lookup, "METRICS_PORT", "9090")?,
            store_backend: parse(&lookup, "STORE_BACKEND", "memory")?,
            scylla_nodes,
            scylla_keyspace: get("SCYLLA_KEYSPACE", "parcel_tracking"),
            business_utc_offset_hours,
            store_timeout: Duration::from_millis(parse(&lookup, "STORE_TIMEOUT_MS", "2000")?),
            history_retry_attempts: parse(&lookup, "HISTORY_RETRY_ATTEMPTS", "5")?,
        })
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            business_utc_offset_hours: self.business_utc_offset_hours,
            store_timeout: self.store_timeout,
            allocator_retry: RetryConfig::with_attempts(3),
            history_retry: RetryConfig::with_attempts(self.history_retry_attempts),
        }
    }
}

fn parse<T, F>(lookup: &F, name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_string());
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
