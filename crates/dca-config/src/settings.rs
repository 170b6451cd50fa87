use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

pub const SANDBOX_API_URL: &str = "https://api-public.sandbox.pro.coinbase.com";
pub const PRODUCTION_API_URL: &str = "https://api.pro.coinbase.com";

/// Typed view of the merged config. Missing sections and keys take defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub exchange: ExchangeSection,
    pub notifications: NotificationsSection,
    pub reconcile: ReconcileSection,
}

impl EngineConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: Self =
            serde_json::from_value(config_json.clone()).context("config does not match engine schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.txn_max_attempts == 0 {
            bail!("CONFIG_INVALID engine.txn_max_attempts must be at least 1");
        }
        if self.engine.submit_timeout_ms == 0 {
            bail!("CONFIG_INVALID engine.submit_timeout_ms must be positive");
        }
        if self.reconcile.batch_limit == 0 {
            bail!("CONFIG_INVALID reconcile.batch_limit must be positive");
        }
        if self.notifications.publish_timeout_ms == 0 {
            bail!("CONFIG_INVALID notifications.publish_timeout_ms must be positive");
        }
        if self.notifications.insufficient_funds_topic.trim().is_empty() {
            bail!("CONFIG_INVALID notifications.insufficient_funds_topic is empty");
        }
        self.exchange.resolved_api_url()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub submit_timeout_ms: u64,
    pub txn_max_attempts: u32,
    pub txn_backoff_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            submit_timeout_ms: 10_000,
            txn_max_attempts: 5,
            txn_backoff_ms: 25,
        }
    }
}

impl EngineSection {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn txn_backoff(&self) -> Duration {
        Duration::from_millis(self.txn_backoff_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VenueEnvironment {
    Local,
    #[default]
    Sandbox,
    Production,
}

impl VenueEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueEnvironment::Local => "LOCAL",
            VenueEnvironment::Sandbox => "SANDBOX",
            VenueEnvironment::Production => "PRODUCTION",
        }
    }

    /// Remote venues sign every request, so their keys must be present.
    pub fn requires_credentials(&self) -> bool {
        !matches!(self, VenueEnvironment::Local)
    }

    fn default_api_url(&self) -> Option<&'static str> {
        match self {
            VenueEnvironment::Local => None,
            VenueEnvironment::Sandbox => Some(SANDBOX_API_URL),
            VenueEnvironment::Production => Some(PRODUCTION_API_URL),
        }
    }
}

impl fmt::Display for VenueEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExchangeSection {
    pub environment: VenueEnvironment,
    pub api_url: Option<String>,
    pub request_timeout_ms: u64,
    pub keys_env: KeysEnv,
}

impl Default for ExchangeSection {
    fn default() -> Self {
        Self {
            environment: VenueEnvironment::default(),
            api_url: None,
            request_timeout_ms: 10_000,
            keys_env: KeysEnv::default(),
        }
    }
}

impl ExchangeSection {
    /// Explicit `api_url` wins; otherwise the environment's well-known URL.
    pub fn resolved_api_url(&self) -> Result<String> {
        if let Some(url) = self.api_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }
        self.environment
            .default_api_url()
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "CONFIG_INVALID exchange.api_url is required when exchange.environment={}",
                    self.environment
                )
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Names of the environment variables holding exchange credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeysEnv {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl Default for KeysEnv {
    fn default() -> Self {
        Self {
            api_key: "DCA_EXCHANGE_API_KEY".to_string(),
            api_secret: "DCA_EXCHANGE_API_SECRET".to_string(),
            passphrase: "DCA_EXCHANGE_API_PASSPHRASE".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationsSection {
    pub insufficient_funds_topic: String,
    pub webhook_env: String,
    /// Bound on one publish; a slow broker never holds up placement.
    pub publish_timeout_ms: u64,
}

impl Default for NotificationsSection {
    fn default() -> Self {
        Self {
            insufficient_funds_topic: "insufficient-funds".to_string(),
            webhook_env: "DCA_NOTIFY_WEBHOOK_URL".to_string(),
            publish_timeout_ms: 2_000,
        }
    }
}

impl NotificationsSection {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcileSection {
    pub staged_grace_seconds: u64,
    pub batch_limit: usize,
    pub lookup_timeout_ms: u64,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            staged_grace_seconds: 900,
            batch_limit: 100,
            lookup_timeout_ms: 10_000,
        }
    }
}

impl ReconcileSection {
    pub fn staged_grace(&self) -> Duration {
        Duration::from_secs(self.staged_grace_seconds)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}
