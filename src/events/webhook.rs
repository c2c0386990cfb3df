//! Webhook delivery over HTTP.

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::events::cef::format_cef;
use crate::events::event::SecurityEvent;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook answered with status {0}")]
    Status(u16),
}

impl DeliveryError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DeliveryError::Serialize(_) => "serialize",
            DeliveryError::Transport(e) if e.is_timeout() => "timeout",
            DeliveryError::Transport(_) => "transport",
            DeliveryError::Status(_) => "status",
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchPayload<'a> {
    events: &'a [SecurityEvent],
    count: usize,
}

/// POSTs events to the configured webhook.
#[derive(Debug, Clone, Default)]
pub struct WebhookClient {
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send one event, as CEF text or JSON depending on the config.
    pub async fn send_event(&self, config: &SecurityConfig, event: &SecurityEvent) -> Result<(), DeliveryError> {
        let (body, content_type) = if config.cef_format {
            (format_cef(event), "text/plain")
        } else {
            (serde_json::to_string(event)?, "application/json")
        };
        self.post(config, body, content_type).await
    }

    /// Send a batch as `{"events": [...], "count": N}`.
    pub async fn send_batch(&self, config: &SecurityConfig, events: &[SecurityEvent]) -> Result<(), DeliveryError> {
        let payload = BatchPayload {
            events,
            count: events.len(),
        };
        let body = serde_json::to_string(&payload)?;
        self.post(config, body, "application/json").await
    }

    async fn post(&self, config: &SecurityConfig, body: String, content_type: &str) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(&config.webhook_url)
            .timeout(config.webhook_timeout)
            .header(CONTENT_TYPE, content_type);
        for (name, value) in &config.webhook_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }
}
