//! Command handlers. Shared wiring (config, secrets, venue, publisher)
//! lives here; each submodule owns one command family.

pub mod alloc;
pub mod ledger;
pub mod order;
pub mod reconcile;

use std::sync::Arc;

use anyhow::{Context, Result};
use dca_config::secrets::{resolve_secrets, ResolvedSecrets};
use dca_config::{EngineConfig, UnusedKeyPolicy};
use dca_db::TxnPolicy;
use dca_exchange_coinbase::{CoinbaseCredentials, CoinbaseExchange};
use dca_execution::{NotificationPublisher, PlacementConfig, TracingPublisher};
use dca_reconcile::SweepConfig;
use tracing::{info, warn};

use crate::webhook::WebhookPublisher;

/// Load layered config (defaults when no paths are given) and its secrets.
pub fn load_engine_config(paths: &[String]) -> Result<(EngineConfig, ResolvedSecrets)> {
    let cfg = if paths.is_empty() {
        EngineConfig::default()
    } else {
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let loaded = dca_config::load_layered_yaml(&refs)?;
        let report = dca_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
        if !report.is_clean() {
            warn!(unused = ?report.unused_leaf_pointers, "config contains keys nothing reads");
        }
        info!(config_hash = %loaded.config_hash, "config loaded");
        loaded.engine()?
    };
    let secrets = resolve_secrets(&cfg)?;
    Ok((cfg, secrets))
}

pub fn placement_config(cfg: &EngineConfig) -> PlacementConfig {
    PlacementConfig {
        submit_timeout: cfg.engine.submit_timeout(),
        txn_policy: TxnPolicy {
            max_attempts: cfg.engine.txn_max_attempts,
            backoff_base: cfg.engine.txn_backoff(),
        },
        insufficient_funds_topic: cfg.notifications.insufficient_funds_topic.clone(),
        notify_timeout: cfg.notifications.publish_timeout(),
    }
}

pub fn sweep_config(cfg: &EngineConfig) -> SweepConfig {
    SweepConfig {
        staged_grace: cfg.reconcile.staged_grace(),
        batch_limit: cfg.reconcile.batch_limit,
        lookup_timeout: cfg.reconcile.lookup_timeout(),
    }
}

pub fn build_exchange(cfg: &EngineConfig, secrets: &ResolvedSecrets) -> Result<CoinbaseExchange> {
    let url = cfg.exchange.resolved_api_url()?;
    // LOCAL venues may run unsigned; remote ones were checked by resolve_secrets.
    let (key, secret, passphrase) = secrets.exchange_credentials().unwrap_or_default();
    let exchange = CoinbaseExchange::new(
        url,
        CoinbaseCredentials::new(key, secret, passphrase),
        cfg.exchange.request_timeout(),
    )
    .context("exchange client init failed")?;
    info!(
        environment = %cfg.exchange.environment,
        api_url = exchange.base_url(),
        "exchange client ready"
    );
    Ok(exchange)
}

pub fn build_publisher(
    cfg: &EngineConfig,
    secrets: &ResolvedSecrets,
) -> Result<Arc<dyn NotificationPublisher>> {
    let publisher: Arc<dyn NotificationPublisher> = match &secrets.notify_webhook_url {
        Some(url) => Arc::new(WebhookPublisher::new(
            url.clone(),
            cfg.exchange.request_timeout(),
        )?),
        None => {
            info!("no webhook configured; notifications go to the log only");
            Arc::new(TracingPublisher)
        }
    };
    Ok(publisher)
}
