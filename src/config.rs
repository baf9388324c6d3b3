// src/config.rs
//! Startup configuration. Everything is parsed into typed values once; a bad
//! or missing required value is a [`ConfigError`] and the process must not start.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_MAX_IN_DURATION: &str = "MAX_IN_DURATION";
pub const ENV_MAX_OUT_DURATION: &str = "MAX_OUT_DURATION";
pub const ENV_TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_TWILIO_FROM_NUMBER: &str = "TWILIO_FROM_NUMBER";
pub const ENV_PHONE_NUMBER: &str = "PHONE_NUMBER";
pub const ENV_TEXT_DRY_RUN: &str = "TEXT_DRY_RUN";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_TICK_INTERVAL_SECS: &str = "TICK_INTERVAL_SECS";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

pub const DEFAULT_FROM_NUMBER: &str = "+18556530788";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;

/// Reminder thresholds, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// "Ok, wrap it up." once today's in-time exceeds this.
    pub max_in_ms: i64,
    /// "Where you at?" once time since the last "out" exceeds this.
    pub max_out_ms: i64,
}

#[derive(Clone, PartialEq, Eq)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderConfig {
    DryRun,
    Twilio(TwilioConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Sqlite { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub thresholds: Thresholds,
    pub sender: SenderConfig,
    pub store: StoreConfig,
    pub bind_addr: SocketAddr,
    pub tick_interval: Duration,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key → value source (process env in production, a map in tests).
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset, like an empty line in .env.
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let thresholds = Thresholds {
            max_in_ms: parse_millis(ENV_MAX_IN_DURATION, get(ENV_MAX_IN_DURATION))?,
            max_out_ms: parse_millis(ENV_MAX_OUT_DURATION, get(ENV_MAX_OUT_DURATION))?,
        };

        let dry_run = parse_flag(get(ENV_TEXT_DRY_RUN));
        let sender = if dry_run {
            SenderConfig::DryRun
        } else {
            SenderConfig::Twilio(TwilioConfig {
                account_sid: require(ENV_TWILIO_ACCOUNT_SID, get(ENV_TWILIO_ACCOUNT_SID))?,
                auth_token: require(ENV_TWILIO_AUTH_TOKEN, get(ENV_TWILIO_AUTH_TOKEN))?,
                from_number: get(ENV_TWILIO_FROM_NUMBER)
                    .unwrap_or_else(|| DEFAULT_FROM_NUMBER.to_string()),
                to_number: require(ENV_PHONE_NUMBER, get(ENV_PHONE_NUMBER))?,
            })
        };

        let store = match get(ENV_DATABASE_URL) {
            Some(url) => StoreConfig::Sqlite { url },
            None => StoreConfig::Memory,
        };

        let raw_addr = get(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: ENV_BIND_ADDR,
            value: raw_addr.clone(),
            reason: format!("{e}"),
        })?;

        let tick_secs = match get(ENV_TICK_INTERVAL_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: ENV_TICK_INTERVAL_SECS,
                        value: raw,
                        reason: "expected a positive number of seconds".into(),
                    })
                }
            },
            None => DEFAULT_TICK_INTERVAL_SECS,
        };

        let log_format = match get(ENV_LOG_FORMAT).map(|v| v.to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Ok(Self {
            thresholds,
            sender,
            store,
            bind_addr,
            tick_interval: Duration::from_secs(tick_secs),
            log_format,
        })
    }
}

fn require(key: &'static str, raw: Option<String>) -> Result<String, ConfigError> {
    raw.ok_or(ConfigError::Missing(key))
}

fn parse_millis(key: &'static str, raw: Option<String>) -> Result<i64, ConfigError> {
    let raw = require(key, raw)?;
    match raw.parse::<i64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        Ok(_) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero".into(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: format!("not an integer number of milliseconds: {e}"),
        }),
    }
}

fn parse_flag(raw: Option<String>) -> bool {
    matches!(
        raw.map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
