//! Configuration loading and representation.

use core::str::FromStr;

use anyhow::Context;
use tracing::warn;

use bookhub_auth::{DEFAULT_PERMISSION_DENIED_MESSAGE, PermissionCatalog};
use bookhub_notifications::NotificationConfig;
use bookhub_observability::LogFormat;

use crate::jobs::RetryPolicy;

pub const LOG_FORMAT_VAR: &str = "BOOKHUB_LOG_FORMAT";
pub const PERMISSION_DENIED_MESSAGE_VAR: &str = "BOOKHUB_PERMISSION_DENIED_MESSAGE";
pub const DISPLAY_UTC_OFFSET_VAR: &str = "BOOKHUB_DISPLAY_UTC_OFFSET_MINUTES";
pub const NOTIFICATION_MAX_ATTEMPTS_VAR: &str = "BOOKHUB_NOTIFICATION_MAX_ATTEMPTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_format: LogFormat,
    pub permission_denied_message: String,
    pub notification: NotificationConfig,
    /// Attempts for each `notification_sender` job before dead-lettering.
    pub notification_max_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            permission_denied_message: DEFAULT_PERMISSION_DENIED_MESSAGE.to_string(),
            notification: NotificationConfig::default(),
            notification_max_attempts: 5,
        }
    }
}

impl AppConfig {
    /// Read the process environment. Malformed values fall back to defaults
    /// with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(format) = or_default(parse_var::<LogFormat>(&lookup, LOG_FORMAT_VAR)) {
            config.log_format = format;
        }

        if let Some(message) = lookup(PERMISSION_DENIED_MESSAGE_VAR) {
            if message.trim().is_empty() {
                warn!(var = PERMISSION_DENIED_MESSAGE_VAR, "empty value; using default");
            } else {
                config.permission_denied_message = message;
            }
        }

        if let Some(minutes) = or_default(parse_var::<i32>(&lookup, DISPLAY_UTC_OFFSET_VAR)) {
            match NotificationConfig::with_utc_offset_minutes(minutes) {
                Some(notification) => config.notification = notification,
                None => warn!(
                    var = DISPLAY_UTC_OFFSET_VAR,
                    minutes, "offset out of range; using UTC"
                ),
            }
        }

        if let Some(attempts) =
            or_default(parse_var::<u32>(&lookup, NOTIFICATION_MAX_ATTEMPTS_VAR))
        {
            config.notification_max_attempts = attempts;
        }

        config
    }

    /// Install the process-wide subscriber in the configured format.
    pub fn init_logging(&self) {
        bookhub_observability::init_with(self.log_format);
    }

    /// Permission catalog with the configured default message.
    pub fn permission_catalog(&self) -> PermissionCatalog {
        PermissionCatalog::standard_with_default(self.permission_denied_message.clone())
    }

    pub fn notification_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.notification_max_attempts)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value '{raw}' for {key}"))
        })
        .transpose()
}

fn or_default<T>(parsed: anyhow::Result<Option<T>>) -> Option<T> {
    parsed.unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "malformed configuration; using default");
        None
    })
}
