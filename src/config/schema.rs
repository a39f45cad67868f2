//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the check service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and drain settings.
    pub server: ServerConfig,

    /// Outbound check behaviour.
    pub checker: CheckerConfig,

    /// Failure classification and alert routing.
    pub alerting: AlertingConfig,

    /// InfluxDB metrics sink.
    pub influxdb: InfluxDbConfig,

    /// Mailgun notifier.
    pub mailgun: MailgunConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub listen_address: String,

    /// Time given to in-flight requests after a shutdown signal.
    pub drain_secs: u64,

    /// Upper bound for inbound requests on every route except `POST /`,
    /// which is bounded by the check and dispatch deadlines instead.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:3000".to_string(),
            drain_secs: 30,
            request_timeout_secs: 40,
            max_request_bytes: 64 * 1024,
        }
    }
}

/// Outbound check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Overall deadline covering DNS, connect, TLS, redirects and body read.
    pub timeout_secs: u64,

    /// Redirect hops followed before giving up.
    pub max_redirects: usize,

    /// Largest response body read from a target.
    pub max_body_bytes: usize,

    /// User-Agent sent to targets.
    pub user_agent: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_redirects: 10,
            max_body_bytes: 10 * 1024 * 1024,
            user_agent: concat!("urlcheck/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// How classified failures reach the collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Dispatch before the check response is written.
    #[default]
    Inline,
    /// Hand off to a background worker; the response does not wait.
    Queued,
}

/// Failure classification and alert routing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Status code that classifies a check as failed.
    pub failure_status: u16,

    /// Dispatch strategy for metric and notification side effects.
    pub dispatch_mode: DispatchMode,

    /// Budget shared by the metric write and the notification of one alert.
    pub dispatch_timeout_secs: u64,

    /// Notification recipient.
    pub recipient: String,

    /// Notification sender.
    pub sender: String,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            failure_status: 404,
            dispatch_mode: DispatchMode::Inline,
            dispatch_timeout_secs: 15,
            recipient: String::new(),
            sender: "no-reply@localhost".to_string(),
        }
    }
}

/// InfluxDB 1.x HTTP write endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InfluxDbConfig {
    pub enabled: bool,

    /// Base URL, e.g. "http://localhost:8086".
    pub host: String,

    /// Target database.
    pub database: String,

    pub username: String,

    pub password: String,

    /// Timestamp precision: "ns", "u", "ms" or "s".
    pub precision: String,
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "http://localhost:8086".to_string(),
            database: "urlcheck".to_string(),
            username: String::new(),
            password: String::new(),
            precision: "s".to_string(),
        }
    }
}

/// Mailgun messages API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailgunConfig {
    pub enabled: bool,

    /// Sending domain, e.g. "mg.example.com".
    pub domain: String,

    /// Private API key.
    pub api_key: String,

    /// API base, without the "/v3" suffix.
    pub base_url: String,
}

impl Default for MailgunConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            domain: String::new(),
            api_key: String::new(),
            base_url: "https://api.mailgun.net".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
