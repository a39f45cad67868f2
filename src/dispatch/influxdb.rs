//! InfluxDB 1.x line-protocol sink.

use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use url::Url;

use crate::config::InfluxDbConfig;
use crate::dispatch::{FieldValue, MetricPoint, MetricsSink, SinkError};

const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes points through the `/write` HTTP endpoint.
pub struct InfluxDbSink {
    client: reqwest::Client,
    write_url: Url,
    username: String,
    password: String,
    precision: String,
}

impl InfluxDbSink {
    pub fn new(config: &InfluxDbConfig) -> Result<Self, SinkError> {
        let mut write_url = Url::parse(&config.host)
            .map_err(|e| SinkError::Config(format!("host '{}': {}", config.host, e)))?;
        write_url
            .path_segments_mut()
            .map_err(|_| SinkError::Config(format!("host '{}' cannot be a base", config.host)))?
            .pop_if_empty()
            .push("write");
        write_url
            .query_pairs_mut()
            .append_pair("db", &config.database)
            .append_pair("precision", &config.precision);

        let client = reqwest::Client::builder().timeout(WRITE_TIMEOUT).build()?;

        Ok(Self {
            client,
            write_url,
            username: config.username.clone(),
            password: config.password.clone(),
            precision: config.precision.clone(),
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }
}

#[async_trait]
impl MetricsSink for InfluxDbSink {
    async fn write(&self, point: &MetricPoint) -> Result<(), SinkError> {
        let line = encode_line(point, &self.precision);
        let mut request = self.client.post(self.write_url.clone()).body(line);
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Encode a point as one line of InfluxDB line protocol.
///
/// Tags with empty values are omitted since the server rejects them.
pub fn encode_line(point: &MetricPoint, precision: &str) -> String {
    let mut line = escape(&point.series, &[',', ' ']);

    for (key, value) in &point.tags {
        if value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape(key, &[',', '=', ' ']));
        line.push('=');
        line.push_str(&escape(value, &[',', '=', ' ']));
    }

    let fields = point
        .fields
        .iter()
        .map(|(key, value)| format!("{}={}", escape(key, &[',', '=', ' ']), field_value(value)))
        .collect::<Vec<_>>()
        .join(",");
    line.push(' ');
    line.push_str(&fields);

    let since_epoch = point.timestamp.duration_since(UNIX_EPOCH).unwrap_or_default();
    let timestamp = match precision {
        "ns" => since_epoch.as_nanos(),
        "u" => since_epoch.as_micros(),
        "ms" => since_epoch.as_millis(),
        _ => u128::from(since_epoch.as_secs()),
    };
    line.push(' ');
    line.push_str(&timestamp.to_string());
    line
}

fn field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(i) => format!("{i}i"),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Text(s) => format!("\"{}\"", escape(s, &['"', '\\'])),
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
