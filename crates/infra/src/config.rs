//! Process configuration read from environment variables.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `DATABASE_URL` | unset | Postgres URL; unset selects the in-memory store |
//! | `SETTLEMENT_AT` | `02:00` | Daily settlement time, `HH:MM` UTC |
//! | `SKU_LOCK_TIMEOUT_MS` | unset | Per-SKU placement lock timeout; unset or `0` disables the lock |

use std::net::SocketAddr;
use std::time::Duration;

use chrono::NaiveTime;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub settlement_at: NaiveTime,
    pub sku_lock_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|_| invalid("BIND_ADDR", raw))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let settlement_at = match get("SETTLEMENT_AT") {
            Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M").map_err(|_| invalid("SETTLEMENT_AT", raw))?,
            None => NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN),
        };

        let sku_lock_timeout = match get("SKU_LOCK_TIMEOUT_MS") {
            Some(raw) => {
                let ms: u64 = raw.parse().map_err(|_| invalid("SKU_LOCK_TIMEOUT_MS", raw))?;
                (ms > 0).then(|| Duration::from_millis(ms))
            }
            None => None,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            settlement_at,
            sku_lock_timeout,
        })
    }
}

fn invalid(key: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid { key, value }
}
