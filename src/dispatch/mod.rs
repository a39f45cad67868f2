//! Outcome classification and side-effect dispatch.
//!
//! # Data Flow
//! ```text
//! CheckResult + JSON payload
//!     → classify.rs (is the status alertable?)
//!     → dispatcher.rs (inline, or queued to a background worker)
//!         → MetricsSink::write   (influxdb.rs, or disabled)
//!         → Notifier::send       (mailgun.rs, or disabled)
//! ```
//!
//! # Design Decisions
//! - Collaborators sit behind traits so tests can record calls
//! - Collaborator failures are logged and swallowed, never retried
//! - No deduplication: every classified failure alerts once

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{InfluxDbConfig, MailgunConfig};

pub mod classify;
pub mod dispatcher;
pub mod influxdb;
pub mod mailgun;

pub use classify::FailurePolicy;
pub use dispatcher::{Alert, AlertDispatch, DispatchWorker, Dispatcher};
pub use influxdb::InfluxDbSink;
pub use mailgun::MailgunNotifier;

/// A single field value of a metric point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// One time-series point handed to a [`MetricsSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub series: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp: SystemTime,
}

/// An alert message handed to a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipient: String,
    pub sender: String,
}

/// Errors reported by a metrics sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("metrics request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("metrics write rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid metrics sink configuration: {0}")]
    Config(String),
}

/// Errors reported by a notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid notifier configuration: {0}")]
    Config(String),
}

/// Time-series database write client.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn write(&self, point: &MetricPoint) -> Result<(), SinkError>;
}

/// Alert delivery client. Returns the provider's message id.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &Notification) -> Result<String, NotifyError>;
}

/// Sink used when no metrics database is configured.
#[derive(Debug, Default)]
pub struct DisabledSink;

#[async_trait]
impl MetricsSink for DisabledSink {
    async fn write(&self, point: &MetricPoint) -> Result<(), SinkError> {
        tracing::debug!(series = %point.series, "Metrics sink disabled, point dropped");
        Ok(())
    }
}

/// Notifier used when no mail provider is configured.
#[derive(Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, message: &Notification) -> Result<String, NotifyError> {
        tracing::info!(subject = %message.subject, "Notifier disabled, alert not delivered");
        Ok(String::new())
    }
}

/// Build the configured metrics sink.
pub fn sink_from_config(config: &InfluxDbConfig) -> Result<Arc<dyn MetricsSink>, SinkError> {
    if config.enabled {
        Ok(Arc::new(InfluxDbSink::new(config)?))
    } else {
        Ok(Arc::new(DisabledSink))
    }
}

/// Build the configured notifier.
pub fn notifier_from_config(config: &MailgunConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    if config.enabled {
        Ok(Arc::new(MailgunNotifier::new(config)?))
    } else {
        Ok(Arc::new(DisabledNotifier))
    }
}
