//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file into a configuration without validating it.
pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load, apply environment overrides, then the listen address flag, and
/// validate the result.
///
/// With no path the defaults are used as the base.
pub fn load_config(path: Option<&Path>, listen_addr: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => AppConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    if let Some(addr) = listen_addr {
        config.server.listen_address = normalize_listen_addr(addr);
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Accept Go-style `:port` addresses as "all interfaces".
pub fn normalize_listen_addr(addr: &str) -> String {
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => addr.to_string(),
    }
}

/// Overlay credentials and endpoints taken from the environment.
///
/// Non-empty values win over the file. Setting `MAILGUN_DOMAIN` or
/// `INFLUXDB_HOST` also enables the corresponding collaborator.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if let Some(domain) = get("MAILGUN_DOMAIN") {
        config.mailgun.domain = domain;
        config.mailgun.enabled = true;
    }
    if let Some(key) = get("MAILGUN_PRIV_API_KEY") {
        config.mailgun.api_key = key;
    }
    if let Some(recipient) = get("MAIL_RECPT") {
        config.alerting.recipient = recipient;
    }
    if let Some(sender) = get("MAIL_REPLY_TO") {
        config.alerting.sender = sender;
    }
    if let Some(host) = get("INFLUXDB_HOST") {
        config.influxdb.host = host;
        config.influxdb.enabled = true;
    }
    if let Some(username) = get("INFLUXDB_USERNAME") {
        config.influxdb.username = username;
    }
    if let Some(password) = get("INFLUXDB_PASSWORD") {
        config.influxdb.password = password;
    }
}
