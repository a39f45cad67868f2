//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Every problem is reported,
//! not just the first one.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listen address '{0}'")]
    ListenAddress(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("alerting.failure_status {0} is not a valid HTTP status")]
    FailureStatus(u16),

    #[error("influxdb.host '{0}' is not a valid URL")]
    InfluxHost(String),

    #[error("influxdb.precision '{0}' must be one of ns, u, ms, s")]
    InfluxPrecision(String),

    #[error("mailgun.{0} is required when mailgun is enabled")]
    MailgunMissing(&'static str),

    #[error("alerting.recipient is required when mailgun is enabled")]
    MissingRecipient,

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.listen_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::ListenAddress(config.server.listen_address.clone()));
    }
    if config.server.drain_secs == 0 {
        errors.push(ValidationError::Zero { field: "server.drain_secs" });
    }
    if config.server.max_request_bytes == 0 {
        errors.push(ValidationError::Zero { field: "server.max_request_bytes" });
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "server.request_timeout_secs" });
    }
    if config.checker.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "checker.timeout_secs" });
    }
    if config.checker.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "checker.max_body_bytes" });
    }
    if config.alerting.dispatch_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "alerting.dispatch_timeout_secs" });
    }
    if !(100..=599).contains(&config.alerting.failure_status) {
        errors.push(ValidationError::FailureStatus(config.alerting.failure_status));
    }

    if config.influxdb.enabled {
        if url::Url::parse(&config.influxdb.host).is_err() {
            errors.push(ValidationError::InfluxHost(config.influxdb.host.clone()));
        }
        if !matches!(config.influxdb.precision.as_str(), "ns" | "u" | "ms" | "s") {
            errors.push(ValidationError::InfluxPrecision(config.influxdb.precision.clone()));
        }
    }

    if config.mailgun.enabled {
        if config.mailgun.domain.is_empty() {
            errors.push(ValidationError::MailgunMissing("domain"));
        }
        if config.mailgun.api_key.is_empty() {
            errors.push(ValidationError::MailgunMissing("api_key"));
        }
        if config.alerting.recipient.is_empty() {
            errors.push(ValidationError::MissingRecipient);
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
