//! Mailgun messages API notifier.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::MailgunConfig;
use crate::dispatch::{Notification, Notifier, NotifyError};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
    #[serde(default)]
    message: String,
}

/// Sends alerts as plain-text mail through Mailgun.
pub struct MailgunNotifier {
    client: reqwest::Client,
    messages_url: Url,
    api_key: String,
}

impl MailgunNotifier {
    pub fn new(config: &MailgunConfig) -> Result<Self, NotifyError> {
        let mut messages_url = Url::parse(&config.base_url)
            .map_err(|e| NotifyError::Config(format!("base_url '{}': {}", config.base_url, e)))?;
        messages_url
            .path_segments_mut()
            .map_err(|_| NotifyError::Config(format!("base_url '{}' cannot be a base", config.base_url)))?
            .pop_if_empty()
            .extend(["v3", config.domain.as_str(), "messages"]);

        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;

        Ok(Self {
            client,
            messages_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn messages_url(&self) -> &Url {
        &self.messages_url
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn send(&self, message: &Notification) -> Result<String, NotifyError> {
        let form = [
            ("from", message.sender.as_str()),
            ("to", message.recipient.as_str()),
            ("subject", message.subject.as_str()),
            ("text", message.body.as_str()),
        ];
        let response = self
            .client
            .post(self.messages_url.clone())
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sent: SendResponse = response.json().await?;
        tracing::debug!(id = %sent.id, response = %sent.message, "Mailgun accepted message");
        Ok(sent.id)
    }
}
