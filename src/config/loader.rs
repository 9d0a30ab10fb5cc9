//! Configuration loading from disk and environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_BASE_URL: &str = "CERT_API_BASE_URL";
pub const ENV_AUTH_KEY: &str = "CERT_API_AUTH_KEY";
pub const ENV_WEBHOOK_TIMEOUT: &str = "WEBHOOK_TIMEOUT";
pub const ENV_WEBHOOK_RETRY_COUNT: &str = "WEBHOOK_RETRY_COUNT";
pub const ENV_WEBHOOK_RETRY_DELAY: &str = "WEBHOOK_RETRY_DELAY";
pub const ENV_PORT: &str = "PORT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML file without validating it.
pub fn parse_file(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(ENV_BASE_URL) {
        config.upstream.base_url = base_url;
    }
    if let Some(auth_key) = lookup(ENV_AUTH_KEY) {
        config.upstream.auth_key = auth_key;
    }
    if let Some(value) = lookup(ENV_WEBHOOK_TIMEOUT) {
        config.webhook.timeout_secs = parse_env(ENV_WEBHOOK_TIMEOUT, value)?;
    }
    if let Some(value) = lookup(ENV_WEBHOOK_RETRY_COUNT) {
        config.webhook.retry_count = parse_env(ENV_WEBHOOK_RETRY_COUNT, value)?;
    }
    if let Some(value) = lookup(ENV_WEBHOOK_RETRY_DELAY) {
        config.webhook.retry_delay_secs = parse_env(ENV_WEBHOOK_RETRY_DELAY, value)?;
    }
    if let Some(value) = lookup(ENV_PORT) {
        let port: u16 = parse_env(ENV_PORT, value)?;
        config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
            Ok(mut addr) => {
                addr.set_port(port);
                addr.to_string()
            }
            Err(_) => format!("0.0.0.0:{}", port),
        };
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }
    Ok(())
}

fn parse_env<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RelayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (ENV_BASE_URL, "http://ca.local:5000"),
                (ENV_AUTH_KEY, "secret"),
                (ENV_WEBHOOK_TIMEOUT, "10"),
                (ENV_WEBHOOK_RETRY_COUNT, "4"),
                (ENV_WEBHOOK_RETRY_DELAY, "2"),
                (ENV_PORT, "9100"),
            ]),
        )
        .unwrap();

        assert_eq!(config.upstream.base_url, "http://ca.local:5000");
        assert_eq!(config.upstream.auth_key, "secret");
        assert_eq!(config.webhook.timeout_secs, 10);
        assert_eq!(config.webhook.retry_count, 4);
        assert_eq!(config.webhook.retry_delay_secs, 2);
        assert_eq!(config.listener.bind_address, "0.0.0.0:9100");
    }

    #[test]
    fn test_bad_numeric_env_is_an_error() {
        let mut config = RelayConfig::default();
        let err = apply_env_overrides(&mut config, env(&[(ENV_WEBHOOK_RETRY_COUNT, "three")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_WEBHOOK_RETRY_COUNT));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("relay-config-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[upstream]\nbase_url = \"https://ca.example.com\"\n[workers]\nmax_concurrent = 4\n",
        )
        .unwrap();

        let config = parse_file(&path).unwrap();
        assert_eq!(config.upstream.base_url, "https://ca.example.com");
        assert_eq!(config.workers.max_concurrent, 4);
        assert_eq!(config.webhook.retry_count, 3);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigError::Validation(vec![ValidationError {
            field: "webhook.retry_count",
            reason: "must be at least 1".into(),
        }]);
        assert_eq!(
            err.to_string(),
            "Validation failed: webhook.retry_count: must be at least 1"
        );
    }
}
