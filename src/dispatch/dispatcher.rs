//! Alert dispatch to the metrics sink and notifier.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use crate::checker::CheckResult;
use crate::config::AlertingConfig;
use crate::dispatch::{FailurePolicy, FieldValue, MetricPoint, MetricsSink, Notification, Notifier};
use crate::observability::metrics;

/// A classified failure waiting to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub link: String,
    pub status: u16,
    pub response_time_millis: u64,
    /// Serialized check result included in the notification.
    pub payload: String,
}

/// Fans a classified failure out to both collaborators.
pub struct Dispatcher {
    policy: FailurePolicy,
    sink: Arc<dyn MetricsSink>,
    notifier: Arc<dyn Notifier>,
    recipient: String,
    sender: String,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        config: &AlertingConfig,
        sink: Arc<dyn MetricsSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            policy: FailurePolicy::new(config.failure_status),
            sink,
            notifier,
            recipient: config.recipient.clone(),
            sender: config.sender.clone(),
            timeout: Duration::from_secs(config.dispatch_timeout_secs),
        }
    }

    /// Override the budget shared by both collaborator calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Classify a result; `Some` when it must be dispatched.
    pub fn classify(&self, result: &CheckResult, payload: &str) -> Option<Alert> {
        if !self.policy.is_failure_class(result.status_code) {
            return None;
        }
        Some(Alert {
            link: result.link.clone(),
            status: result.status_code,
            response_time_millis: result.response_time_millis,
            payload: payload.to_string(),
        })
    }

    /// Emit the metric point, then the notification.
    ///
    /// Both calls share one deadline. Errors and expiry are logged and
    /// dropped.
    pub async fn dispatch(&self, alert: &Alert) {
        metrics::record_alert(alert.status);
        let deadline = Instant::now() + self.timeout;

        let point = metric_point(alert, SystemTime::now());
        match timeout_at(deadline, self.sink.write(&point)).await {
            Ok(Ok(())) => tracing::debug!(url = %alert.link, "Metric point written"),
            Ok(Err(e)) => {
                metrics::record_dispatch_failure("metrics_sink");
                tracing::error!(url = %alert.link, error = %e, "Failed to write metric point");
            }
            Err(_) => {
                metrics::record_dispatch_failure("metrics_sink");
                tracing::error!(url = %alert.link, timeout = ?self.timeout, "Metric write abandoned at dispatch deadline");
            }
        }

        let message = self.notification(alert);
        match timeout_at(deadline, self.notifier.send(&message)).await {
            Ok(Ok(id)) => tracing::info!(url = %alert.link, message_id = %id, "Alert notification sent"),
            Ok(Err(e)) => {
                metrics::record_dispatch_failure("notifier");
                tracing::error!(url = %alert.link, error = %e, "Failed to send alert notification");
            }
            Err(_) => {
                metrics::record_dispatch_failure("notifier");
                tracing::error!(url = %alert.link, timeout = ?self.timeout, "Alert notification abandoned at dispatch deadline");
            }
        }
    }

    fn notification(&self, alert: &Alert) -> Notification {
        Notification {
            subject: format!("{} Detected: {}", alert.status, alert.link),
            body: format!("Link checked: {}\n\n{}", alert.link, alert.payload),
            recipient: self.recipient.clone(),
            sender: self.sender.clone(),
        }
    }
}

/// Metric point for an alert, named after the link.
pub fn metric_point(alert: &Alert, timestamp: SystemTime) -> MetricPoint {
    let tags = BTreeMap::from([
        ("url".to_string(), alert.link.clone()),
        ("responseCode".to_string(), alert.status.to_string()),
    ]);
    let fields = BTreeMap::from([
        (
            "response_time".to_string(),
            FieldValue::Integer(i64::try_from(alert.response_time_millis).unwrap_or(i64::MAX)),
        ),
        ("response_code".to_string(), FieldValue::Integer(i64::from(alert.status))),
    ]);
    MetricPoint {
        series: alert.link.clone(),
        tags,
        fields,
        timestamp,
    }
}

/// Handle used by request handlers to submit alerts.
///
/// Inline handles dispatch on the caller's task; queued handles push onto a
/// channel drained by a [`DispatchWorker`].
#[derive(Clone)]
pub struct AlertDispatch {
    dispatcher: Arc<Dispatcher>,
    queue: Option<mpsc::UnboundedSender<Alert>>,
}

impl AlertDispatch {
    pub fn inline(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            queue: None,
        }
    }

    pub fn queued(dispatcher: Arc<Dispatcher>) -> (Self, DispatchWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            dispatcher: dispatcher.clone(),
            queue: Some(tx),
        };
        (handle, DispatchWorker { dispatcher, rx })
    }

    pub fn classify(&self, result: &CheckResult, payload: &str) -> Option<Alert> {
        self.dispatcher.classify(result, payload)
    }

    /// Dispatch now, or enqueue for the worker.
    pub async fn submit(&self, alert: Alert) {
        match &self.queue {
            Some(tx) => {
                if let Err(mpsc::error::SendError(alert)) = tx.send(alert) {
                    tracing::warn!(url = %alert.link, "Dispatch worker gone, dispatching inline");
                    self.dispatcher.dispatch(&alert).await;
                }
            }
            None => self.dispatcher.dispatch(&alert).await,
        }
    }
}

/// Background consumer for queued alerts.
///
/// Runs until every [`AlertDispatch`] handle has been dropped and the queue
/// is empty.
pub struct DispatchWorker {
    dispatcher: Arc<Dispatcher>,
    rx: mpsc::UnboundedReceiver<Alert>,
}

impl DispatchWorker {
    pub async fn run(mut self) {
        tracing::info!("Dispatch worker started");
        while let Some(alert) = self.rx.recv().await {
            self.dispatcher.dispatch(&alert).await;
        }
        tracing::info!("Dispatch worker drained");
    }
}
