use std::env;
use std::time::Duration;

use chrono_tz::Tz;
use dotenvy::dotenv;
use tracing::info;

use crate::error::ConfigError;
use crate::notify::RenderMode;
use crate::scheduler::RetryPolicy;

/// Runtime settings. Every field has a default; see [`AppConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Zone deadlines are typed in.
    pub timezone: Tz,
    pub render_mode: RenderMode,
    /// Upper bound on any single store or scheduler call.
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
    /// Mailbox size of every actor.
    pub channel_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Singapore,
            render_mode: RenderMode::Html,
            call_timeout: Duration::from_millis(5000),
            retry: RetryPolicy::default(),
            channel_buffer: 32,
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads `ORDER_BOT_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        let config = Self::from_lookup(|name| env::var(name).ok())?;
        info!(timezone = %config.timezone, render_mode = ?config.render_mode, "Configuration loaded");
        Ok(config)
    }

    /// Builds a config from any variable source; unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let read = |name: &'static str| lookup(name).map(|value| value.trim().to_string()).filter(|v| !v.is_empty());

        let timezone = match read("ORDER_BOT_TIMEZONE") {
            Some(value) => value.parse::<Tz>().map_err(|e| invalid("ORDER_BOT_TIMEZONE", e))?,
            None => defaults.timezone,
        };
        let render_mode = match read("ORDER_BOT_RENDER_MODE") {
            Some(value) => value.parse::<RenderMode>().map_err(|e| invalid("ORDER_BOT_RENDER_MODE", e))?,
            None => defaults.render_mode,
        };
        let call_timeout = match read("ORDER_BOT_CALL_TIMEOUT_MS") {
            Some(value) => Duration::from_millis(positive("ORDER_BOT_CALL_TIMEOUT_MS", &value)?),
            None => defaults.call_timeout,
        };
        let max_attempts = match read("ORDER_BOT_JOB_MAX_ATTEMPTS") {
            Some(value) => u32::try_from(positive("ORDER_BOT_JOB_MAX_ATTEMPTS", &value)?)
                .map_err(|e| invalid("ORDER_BOT_JOB_MAX_ATTEMPTS", e))?,
            None => defaults.retry.max_attempts,
        };
        let backoff = match read("ORDER_BOT_JOB_RETRY_BACKOFF_MS") {
            Some(value) => Duration::from_millis(
                value
                    .parse::<u64>()
                    .map_err(|e| invalid("ORDER_BOT_JOB_RETRY_BACKOFF_MS", e))?,
            ),
            None => defaults.retry.backoff,
        };
        let channel_buffer = match read("ORDER_BOT_CHANNEL_BUFFER") {
            Some(value) => usize::try_from(positive("ORDER_BOT_CHANNEL_BUFFER", &value)?)
                .map_err(|e| invalid("ORDER_BOT_CHANNEL_BUFFER", e))?,
            None => defaults.channel_buffer,
        };

        Ok(Self {
            timezone,
            render_mode,
            call_timeout,
            retry: RetryPolicy { max_attempts, backoff },
            channel_buffer,
        })
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

fn positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(0) => Err(invalid(name, "must be at least 1")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(name, e)),
    }
}
