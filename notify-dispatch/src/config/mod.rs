//! Process configuration.
//!
//! Everything is read from environment variables (optionally seeded from a
//! `.env` file by `main`). Unset variables fall back to defaults; set but
//! unparsable variables are a configuration error.

use std::path::PathBuf;
use std::str::FromStr;

use crate::api::server::ApiServerConfig;
use crate::notification::NotificationServiceConfig;
use crate::notification::transport::SimulationConfig;
use crate::{Error, Result};

/// Default directory for rolling log files.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Upper bound for retry delays (one hour).
pub const MAX_RETRY_DELAY_MS: u64 = 60 * 60 * 1000;

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server settings.
    pub api: ApiServerConfig,
    /// Directory for log files.
    pub log_dir: PathBuf,
    /// Optional JSON file with recipients to load at startup.
    pub recipients_file: Option<PathBuf>,
    /// Dispatch engine settings.
    pub notification: NotificationServiceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiServerConfig::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            recipients_file: None,
            notification: NotificationServiceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Supported variables:
    /// - `API_BIND_ADDRESS`, `API_PORT`
    /// - `LOG_DIR`
    /// - `NOTIFY_RECIPIENTS_FILE`
    /// - `NOTIFY_MAX_RETRIES`, `NOTIFY_RETRY_INITIAL_DELAY_MS`, `NOTIFY_RETRY_MAX_DELAY_MS`
    /// - `NOTIFY_WORKERS`, `NOTIFY_QUEUE_CAPACITY`
    /// - `NOTIFY_{EMAIL,SMS,CHAT}_ENABLED`, `_FAIL_RATE`, `_MAX_DELAY_MS`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(bind_address) = get("API_BIND_ADDRESS") {
            config.api.bind_address = bind_address.trim().to_string();
        }
        if let Some(port) = parse_var(&get, "API_PORT")? {
            config.api.port = port;
        }
        if let Some(log_dir) = get("LOG_DIR") {
            config.log_dir = PathBuf::from(log_dir.trim());
        }
        config.recipients_file = get("NOTIFY_RECIPIENTS_FILE").map(|p| PathBuf::from(p.trim()));

        let notification = &mut config.notification;
        if let Some(max_retries) = parse_var(&get, "NOTIFY_MAX_RETRIES")? {
            notification.retry.max_retries = max_retries;
        }
        if let Some(delay) = parse_var(&get, "NOTIFY_RETRY_INITIAL_DELAY_MS")? {
            notification.retry.initial_delay_ms = delay;
        }
        if let Some(delay) = parse_var(&get, "NOTIFY_RETRY_MAX_DELAY_MS")? {
            notification.retry.max_delay_ms = delay;
        }
        let retry = &notification.retry;
        for (key, value) in [
            ("NOTIFY_RETRY_INITIAL_DELAY_MS", retry.initial_delay_ms),
            ("NOTIFY_RETRY_MAX_DELAY_MS", retry.max_delay_ms),
        ] {
            if value > MAX_RETRY_DELAY_MS {
                return Err(Error::config(format!(
                    "{key} must be at most {MAX_RETRY_DELAY_MS}, got {value}"
                )));
            }
        }
        if retry.initial_delay_ms > retry.max_delay_ms {
            return Err(Error::config(format!(
                "NOTIFY_RETRY_INITIAL_DELAY_MS ({}) exceeds NOTIFY_RETRY_MAX_DELAY_MS ({})",
                retry.initial_delay_ms, retry.max_delay_ms
            )));
        }
        if let Some(workers) = parse_var::<usize, _>(&get, "NOTIFY_WORKERS")? {
            if workers == 0 {
                return Err(Error::config("NOTIFY_WORKERS must be at least 1"));
            }
            notification.worker.max_concurrent = workers;
        }
        if let Some(capacity) = parse_var::<usize, _>(&get, "NOTIFY_QUEUE_CAPACITY")? {
            if capacity == 0 {
                return Err(Error::config("NOTIFY_QUEUE_CAPACITY must be at least 1"));
            }
            notification.worker.queue_capacity = capacity;
        }

        let channels = &mut notification.channels;
        apply_channel_env(&get, "EMAIL", &mut channels.email.enabled, &mut channels.email.simulation)?;
        apply_channel_env(&get, "SMS", &mut channels.sms.enabled, &mut channels.sms.simulation)?;
        apply_channel_env(&get, "CHAT", &mut channels.chat.enabled, &mut channels.chat.simulation)?;

        Ok(config)
    }
}

fn apply_channel_env<G>(
    get: &G,
    channel: &str,
    enabled: &mut bool,
    simulation: &mut SimulationConfig,
) -> Result<()>
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(value) = parse_var(get, &format!("NOTIFY_{channel}_ENABLED"))? {
        *enabled = value;
    }
    if let Some(fail_rate) = parse_var::<f64, _>(get, &format!("NOTIFY_{channel}_FAIL_RATE"))? {
        if !(0.0..=1.0).contains(&fail_rate) {
            return Err(Error::config(format!(
                "NOTIFY_{channel}_FAIL_RATE must be between 0 and 1, got {fail_rate}"
            )));
        }
        simulation.fail_rate = fail_rate;
    }
    if let Some(max_delay_ms) = parse_var(get, &format!("NOTIFY_{channel}_MAX_DELAY_MS"))? {
        simulation.max_delay_ms = max_delay_ms;
    }
    Ok(())
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::config(format!("invalid value for {key} ({raw:?}): {e}"))),
    }
}
