//! Layered YAML configuration for the DCA engine.
//!
//! Documents are merged in order (later overrides earlier), converted to JSON,
//! checked for secret literals, then hashed over the canonical serialization
//! so two runs with the same effective config report the same `config_hash`.
//! Secrets never live in YAML; the config names environment variables and
//! [`secrets`] resolves them at startup.

use std::fs;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

mod keys;
pub mod secrets;
mod settings;

pub use keys::{report_unused_keys, UnusedKeyPolicy, UnusedKeyReport, CONSUMED_POINTERS};
pub use settings::{
    EngineConfig, EngineSection, ExchangeSection, KeysEnv, NotificationsSection,
    ReconcileSection, VenueEnvironment, PRODUCTION_API_URL, SANDBOX_API_URL,
};

/// Value prefixes that are never acceptable as literal config strings.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live_",
    "sk_test_",
    "AKIA",
    "ghp_",
    "xoxb-",
    "-----BEGIN",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Deserialize the merged tree into the typed engine settings.
    pub fn engine(&self) -> Result<EngineConfig> {
        EngineConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for (idx, raw) in yaml_docs.iter().enumerate() {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {idx}"))?;
        let doc = serde_json::to_value(doc).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, doc);
    }

    reject_secret_literals(&merged)?;

    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; any other overlay value replaces the base.
fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                let prior = base_map.remove(&k).unwrap_or(Value::Null);
                base_map.insert(k, deep_merge(prior, v));
            }
            Value::Object(base_map)
        }
        (_, replacement) => replacement,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn reject_secret_literals(v: &Value) -> Result<()> {
    for ptr in keys::leaf_pointers(v) {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
