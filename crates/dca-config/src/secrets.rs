//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES. Callers resolve once at startup and
//! pass [`ResolvedSecrets`] into constructors. `Debug` redacts every value and
//! errors mention the variable name, never its content.

use anyhow::{bail, Result};

use crate::EngineConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub exchange_api_key: Option<String>,
    pub exchange_api_secret: Option<String>,
    pub exchange_passphrase: Option<String>,
    /// Webhook URLs often carry auth in the path, so this is a secret too.
    pub notify_webhook_url: Option<String>,
}

impl ResolvedSecrets {
    /// `(key, secret, passphrase)` when all three are present.
    pub fn exchange_credentials(&self) -> Option<(String, String, String)> {
        Some((
            self.exchange_api_key.clone()?,
            self.exchange_api_secret.clone()?,
            self.exchange_passphrase.clone()?,
        ))
    }
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(v: &Option<String>) -> Option<&'static str> {
            v.as_ref().map(|_| "<REDACTED>")
        }
        f.debug_struct("ResolvedSecrets")
            .field("exchange_api_key", &redact(&self.exchange_api_key))
            .field("exchange_api_secret", &redact(&self.exchange_api_secret))
            .field("exchange_passphrase", &redact(&self.exchange_passphrase))
            .field("notify_webhook_url", &redact(&self.notify_webhook_url))
            .finish()
    }
}

/// Resolve secrets from the process environment.
pub fn resolve_secrets(cfg: &EngineConfig) -> Result<ResolvedSecrets> {
    resolve_secrets_with(cfg, |name| std::env::var(name).ok())
}

/// Resolve secrets through `lookup`. Blank values count as absent.
///
/// Exchange keys are required when the venue environment signs requests;
/// the webhook is always optional.
pub fn resolve_secrets_with<F>(cfg: &EngineConfig, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    };

    let keys = &cfg.exchange.keys_env;
    let secrets = ResolvedSecrets {
        exchange_api_key: read(&keys.api_key),
        exchange_api_secret: read(&keys.api_secret),
        exchange_passphrase: read(&keys.passphrase),
        notify_webhook_url: read(&cfg.notifications.webhook_env),
    };

    let env = cfg.exchange.environment;
    if env.requires_credentials() {
        let required = [
            (&keys.api_key, &secrets.exchange_api_key),
            (&keys.api_secret, &secrets.exchange_api_secret),
            (&keys.passphrase, &secrets.exchange_passphrase),
        ];
        for (name, value) in required {
            if value.is_none() {
                bail!(
                    "SECRETS_MISSING environment={env}: required env var '{}' is not set or empty",
                    name.trim()
                );
            }
        }
    }
    Ok(secrets)
}
