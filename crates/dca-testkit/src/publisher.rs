use std::sync::Mutex;

use async_trait::async_trait;
use dca_execution::{NotificationPublisher, PublishError};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Succeed,
    Fail,
    Hang,
}

/// Captures every publish. A failing or hanging recorder still records first.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(String, Value)>>,
    mode: Mode,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            events: Mutex::default(),
            mode: Mode::Fail,
        }
    }

    /// Records the publish, then never returns.
    pub fn hanging() -> Self {
        Self {
            events: Mutex::default(),
            mode: Mode::Hang,
        }
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl NotificationPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), PublishError> {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((topic.to_string(), payload));
        match self.mode {
            Mode::Succeed => Ok(()),
            Mode::Fail => Err(PublishError {
                topic: topic.to_string(),
                message: "broker unavailable".to_string(),
            }),
            Mode::Hang => std::future::pending().await,
        }
    }
}
