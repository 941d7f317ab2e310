//! mreg-config
//!
//! Layered YAML configuration for the registry tooling.
//!
//! Layers are merged in order (later layers override earlier ones), rendered
//! to canonical JSON and hashed so a promotion can be attributed to the exact
//! configuration it ran under. Config files hold env var NAMES for secrets,
//! never the secret values; see [`settings`] for runtime resolution.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;

pub mod settings;

pub use settings::{
    resolve_settings, resolve_settings_with_env, RegistrySettings, SettingsOverrides,
    StoreBackend, DEFAULT_STORE_ROOT, ENV_API_KEY, ENV_ENTITY, ENV_LOG_LEVEL, ENV_PROJECT,
    ENV_STORE_ROOT, ENV_STORE_URL,
};

/// Known secret-like prefixes. If any leaf string value in the effective
/// config starts with one of these, loading aborts with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
    "local-",     // self-hosted W&B keys
];

/// Registry API keys are 40 lowercase hex characters.
const REGISTRY_KEY_LEN: usize = 40;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// No layers: `{}` with its hash.
    pub fn empty() -> Result<Self> {
        load_layered_yaml_from_strings(&[])
    }
}

/// Read and merge YAML files, first path lowest precedence.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    for path in paths {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("CONFIG_READ_FAILED path={path}"))?;
        if let Some(layer) = parse_layer(&raw).with_context(|| format!("config layer {path}"))? {
            overlay(&mut merged, layer);
        }
    }
    seal(merged)
}

/// Same as [`load_layered_yaml`] over in-memory documents.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    for (idx, raw) in yaml_docs.iter().enumerate() {
        if let Some(layer) = parse_layer(raw).with_context(|| format!("config layer #{idx}"))? {
            overlay(&mut merged, layer);
        }
    }
    seal(merged)
}

/// One YAML document as JSON. An empty document is no layer at all.
fn parse_layer(raw: &str) -> Result<Option<Value>> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
    let json = serde_json::to_value(yaml).context("yaml is not representable as json")?;
    Ok((!json.is_null()).then_some(json))
}

/// Merge `layer` into `base` in place. Objects merge key by key; anything
/// else in `layer` replaces what `base` held.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Reject secret literals, then render and hash. `serde_json::Map` keeps keys
/// sorted, so the rendering does not depend on key order in the YAML.
fn seal(config_json: Value) -> Result<LoadedConfig> {
    enforce_no_secret_literals(&config_json)?;
    let canonical_json = serde_json::to_string(&config_json).context("render canonical json")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json,
    })
}

/// JSON pointer of the first leaf string that looks like a secret literal.
fn find_secret_leaf(v: &Value, pointer: &mut String) -> Option<String> {
    match v {
        Value::Object(map) => map.iter().find_map(|(k, child)| {
            let len = pointer.len();
            pointer.push('/');
            pointer.push_str(&k.replace('~', "~0").replace('/', "~1"));
            let hit = find_secret_leaf(child, pointer);
            pointer.truncate(len);
            hit
        }),
        Value::Array(items) => items.iter().enumerate().find_map(|(i, child)| {
            let len = pointer.len();
            pointer.push_str(&format!("/{i}"));
            let hit = find_secret_leaf(child, pointer);
            pointer.truncate(len);
            hit
        }),
        Value::String(s) if looks_like_secret(s) => Some(if pointer.is_empty() {
            "/".to_string()
        } else {
            pointer.clone()
        }),
        _ => None,
    }
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    if let Some(leaf) = find_secret_leaf(v, &mut String::new()) {
        bail!("CONFIG_SECRET_DETECTED leaf={leaf} value=REDACTED");
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    if t.len() == REGISTRY_KEY_LEN && t.bytes().all(|b| b.is_ascii_hexdigit()) {
        return true;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
