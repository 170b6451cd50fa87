use anyhow::{bail, Result};
use serde_json::Value;

/// JSON pointers the engine reads. A pointer consumes itself and every leaf
/// below it.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/engine/submit_timeout_ms",
    "/engine/txn_max_attempts",
    "/engine/txn_backoff_ms",
    "/exchange/environment",
    "/exchange/api_url",
    "/exchange/request_timeout_ms",
    "/exchange/keys_env",
    "/notifications/insufficient_funds_topic",
    "/notifications/webhook_env",
    "/notifications/publish_timeout_ms",
    "/reconcile/staged_grace_seconds",
    "/reconcile/batch_limit",
    "/reconcile/lookup_timeout_ms",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedKeyReport {
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// List leaves no component reads. Under [`UnusedKeyPolicy::Fail`] a
/// non-empty list is an error; otherwise the caller decides how to log it.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut unused: Vec<String> = leaf_pointers(config_json)
        .into_iter()
        .filter(|leaf| !CONSUMED_POINTERS.iter().any(|p| consumes(p, leaf)))
        .collect();
    unused.sort();

    if policy == UnusedKeyPolicy::Fail && !unused.is_empty() {
        let preview: Vec<&String> = unused.iter().take(12).collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. First few: {:?}",
            unused.len(),
            preview
        );
    }
    Ok(UnusedKeyReport {
        unused_leaf_pointers: unused,
    })
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc".
fn consumes(prefix: &str, leaf: &str) -> bool {
    match leaf.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub(crate) fn leaf_pointers(v: &Value) -> Vec<String> {
    let mut out = Vec::new();
    walk(v, String::new(), &mut out);
    out
}

fn walk(v: &Value, at: String, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, child) in map {
                walk(child, format!("{at}/{}", k.replace('~', "~0").replace('/', "~1")), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                walk(child, format!("{at}/{i}"), out);
            }
        }
        _ if at.is_empty() => out.push("/".to_string()),
        _ => out.push(at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefix_respects_segment_boundary() {
        assert!(consumes("/exchange/keys_env", "/exchange/keys_env/api_key"));
        assert!(consumes("/engine/txn_max_attempts", "/engine/txn_max_attempts"));
        assert!(!consumes("/engine/txn", "/engine/txn_max_attempts"));
    }

    #[test]
    fn escaped_tokens_and_array_indices() {
        let leaves = leaf_pointers(&json!({"a/b": {"c~d": [1, 2]}}));
        assert_eq!(leaves, vec!["/a~1b/c~0d/0", "/a~1b/c~0d/1"]);
    }
}
