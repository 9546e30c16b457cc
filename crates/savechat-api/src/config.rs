use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How bearer tokens are checked. JWT wins when both secrets are set.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    Jwt { secret: String },
    ApiKey { key: String },
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt { .. } => formatter
                .debug_struct("Jwt")
                .field("secret", &"[REDACTED]")
                .finish(),
            Self::ApiKey { .. } => formatter
                .debug_struct("ApiKey")
                .field("key", &"[REDACTED]")
                .finish(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub auth: AuthMode,
    pub cors_origins: Vec<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub store_timeout: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("auth", &self.auth)
            .field("cors_origins", &self.cors_origins)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "SAVECHAT_BIND_ADDR", "127.0.0.1:8080");
        let db_path = PathBuf::from(value_or_default(&lookup, "SAVECHAT_DB_PATH", "savechat.db"));

        let auth = match (
            optional_trimmed(&lookup, "JWT_SECRET"),
            optional_trimmed(&lookup, "API_KEY_SECRET"),
        ) {
            (Some(secret), _) => AuthMode::Jwt { secret },
            (None, Some(key)) => AuthMode::ApiKey { key },
            (None, None) => return Err(ConfigError::MissingVar("JWT_SECRET or API_KEY_SECRET")),
        };

        let cors_origins = optional_trimmed(&lookup, "CORS_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_max = bounded(&lookup, "RATE_LIMIT_MAX", 100_u32, 1, 10_000)?;
        let rate_limit_window_secs = bounded(&lookup, "RATE_LIMIT_WINDOW_SECS", 60_u64, 1, 3_600)?;
        let store_timeout_ms = bounded(&lookup, "STORE_TIMEOUT_MS", 5_000_u64, 100, 60_000)?;

        Ok(Self {
            bind_addr,
            db_path,
            auth,
            cors_origins,
            rate_limit_max,
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            store_timeout: Duration::from_millis(store_timeout_ms),
        })
    }
}

/// Parse an integer variable and check it lies in `[min, max]`.
fn bounded<T>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
    min: T,
    max: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display + Copy,
{
    let value = match optional_trimmed(lookup, name) {
        Some(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::Invalid(format!("{name} must be an integer in [{min}, {max}]"))
        })?,
        None => default,
    };
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{min}, {max}]"
        )));
    }
    Ok(value)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
