use std::time::Duration;

use async_trait::async_trait;
use dca_execution::{NotificationPublisher, PublishError};
use serde_json::{json, Value};
use tracing::debug;

/// Posts `{"topic": .., "payload": ..}` to a single webhook URL.
pub struct WebhookPublisher {
    http: reqwest::Client,
    url: String,
}

impl WebhookPublisher {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl NotificationPublisher for WebhookPublisher {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError> {
        let fail = |message: String| PublishError {
            topic: topic.to_string(),
            message,
        };
        let resp = self
            .http
            .post(&self.url)
            .json(&json!({ "topic": topic, "payload": payload }))
            .send()
            .await
            .map_err(|e| fail(e.without_url().to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(fail(format!("webhook returned HTTP {}", status.as_u16())));
        }
        debug!(topic, "notification delivered");
        Ok(())
    }
}
