//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub generation_webhook_url: String,
    pub calendar_webhook_url: String,
    pub transcription_webhook_url: Option<String>,
    /// File backing the content cache slot; the slot lives in memory when unset.
    pub cache_path: Option<PathBuf>,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Remote Endpoints ---
        let generation_webhook_url = required_url(&lookup, "GENERATION_WEBHOOK_URL")?;
        let calendar_webhook_url = required_url(&lookup, "CALENDAR_WEBHOOK_URL")?;
        let transcription_webhook_url = match non_empty(&lookup, "TRANSCRIPTION_WEBHOOK_URL") {
            Some(url) => Some(validated_url("TRANSCRIPTION_WEBHOOK_URL", url)?),
            None => None,
        };

        // --- Local State ---
        let cache_path = non_empty(&lookup, "CACHE_PATH").map(PathBuf::from);
        let cors_origin = non_empty(&lookup, "CORS_ORIGIN")
            .unwrap_or_else(|| "http://localhost:5173".to_string());

        Ok(Self {
            bind_address,
            log_level,
            generation_webhook_url,
            calendar_webhook_url,
            transcription_webhook_url,
            cache_path,
            cors_origin,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required_url<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let url = non_empty(lookup, key).ok_or_else(|| ConfigError::MissingVar(key.to_string()))?;
    validated_url(key, url)
}

fn validated_url(key: &str, url: String) -> Result<String, ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url)
    } else {
        Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not an http(s) URL", url),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults_for_optional_settings() {
        let config = Config::from_lookup(lookup_from(&[
            ("GENERATION_WEBHOOK_URL", "https://hook.example/generate"),
            ("CALENDAR_WEBHOOK_URL", "https://hook.example/calendar"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.transcription_webhook_url, None);
        assert_eq!(config.cache_path, None);
        assert_eq!(config.cors_origin, "http://localhost:5173");
    }

    #[test]
    fn requires_both_webhooks() {
        let err = Config::from_lookup(lookup_from(&[(
            "GENERATION_WEBHOOK_URL",
            "https://hook.example/generate",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(key) if key == "CALENDAR_WEBHOOK_URL"));
    }

    #[test]
    fn rejects_invalid_values() {
        let err = Config::from_lookup(lookup_from(&[
            ("GENERATION_WEBHOOK_URL", "hook.example/generate"),
            ("CALENDAR_WEBHOOK_URL", "https://hook.example/calendar"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "GENERATION_WEBHOOK_URL"));

        let err = Config::from_lookup(lookup_from(&[
            ("GENERATION_WEBHOOK_URL", "https://hook.example/generate"),
            ("CALENDAR_WEBHOOK_URL", "https://hook.example/calendar"),
            ("RUST_LOG", "chatty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "RUST_LOG"));
    }
}
