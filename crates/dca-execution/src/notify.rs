use async_trait::async_trait;
use dca_db::{AccountId, AssetId};
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, thiserror::Error)]
#[error("publish to {topic} failed: {message}")]
pub struct PublishError {
    pub topic: String,
    pub message: String,
}

/// Fire-and-forget event fan-out. Callers log and ignore failures.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError>;
}

/// Payload announcing that an account could not fund a purchase.
pub fn insufficient_funds_payload(account: &AccountId, asset: &AssetId) -> Value {
    json!({
        "profileId": account.as_str(),
        "product": asset.as_str(),
    })
}

/// Publisher that only writes the event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

#[async_trait]
impl NotificationPublisher for TracingPublisher {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError> {
        info!(topic, payload = %payload, "notification");
        Ok(())
    }
}
