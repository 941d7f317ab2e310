//! Runtime resolution of registry settings.
//!
//! Built once at startup and passed into store constructors; nothing else
//! reads the environment. Precedence per field, highest first:
//! CLI override, environment, config YAML, built-in default.
//!
//! The api key is only ever read from the environment (the YAML may name
//! which variable via `registry.api_key_env`). Errors mention the variable
//! NAME, never its value, and `Debug` redacts it.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde_json::Value;

pub const ENV_API_KEY: &str = "WANDB_API_KEY";
pub const ENV_ENTITY: &str = "WANDB_ENTITY";
pub const ENV_PROJECT: &str = "WANDB_PROJECT";
pub const ENV_STORE_ROOT: &str = "MREG_STORE_ROOT";
pub const ENV_STORE_URL: &str = "MREG_STORE_URL";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

pub const DEFAULT_STORE_ROOT: &str = "./registry";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Directory-backed registry.
    Fs { root: PathBuf },
    /// Remote registry service.
    Http { base_url: String },
}

impl StoreBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreBackend::Fs { .. } => "fs",
            StoreBackend::Http { .. } => "http",
        }
    }
}

/// Everything a registry command needs to build its store.
/// **The api key is redacted in `Debug` output.**
#[derive(Clone)]
pub struct RegistrySettings {
    pub entity: String,
    pub project: String,
    /// `None` if the named env var was absent or blank.
    pub api_key: Option<String>,
    /// Name of the env var the api key was read from.
    pub api_key_env: String,
    pub backend: StoreBackend,
}

impl std::fmt::Debug for RegistrySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySettings")
            .field("entity", &self.entity)
            .field("project", &self.project)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("api_key_env", &self.api_key_env)
            .field("backend", &self.backend)
            .finish()
    }
}

/// Values given on the command line; `None` defers to lower layers.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub entity: Option<String>,
    pub project: Option<String>,
    pub store_root: Option<PathBuf>,
    pub store_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Non-empty trimmed string at `pointer`.
fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn process_env(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok()
}

fn resolve_backend(
    config_json: &Value,
    overrides: &SettingsOverrides,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<StoreBackend> {
    if let Some(base_url) = non_blank(overrides.store_url.clone()) {
        return Ok(StoreBackend::Http { base_url });
    }
    if let Some(root) = overrides.store_root.clone() {
        return Ok(StoreBackend::Fs { root });
    }
    if let Some(base_url) = non_blank(env(ENV_STORE_URL)) {
        return Ok(StoreBackend::Http { base_url });
    }
    if let Some(root) = non_blank(env(ENV_STORE_ROOT)) {
        return Ok(StoreBackend::Fs { root: root.into() });
    }

    let kind = read_str_at(config_json, "/store/backend").unwrap_or_else(|| "fs".to_string());
    match kind.to_ascii_lowercase().as_str() {
        "fs" => Ok(StoreBackend::Fs {
            root: read_str_at(config_json, "/store/root")
                .unwrap_or_else(|| DEFAULT_STORE_ROOT.to_string())
                .into(),
        }),
        "http" => match read_str_at(config_json, "/store/base_url") {
            Some(base_url) => Ok(StoreBackend::Http { base_url }),
            None => bail!("CONFIG_INVALID: store.backend=http requires store.base_url"),
        },
        other => bail!(
            "CONFIG_INVALID: unrecognised store.backend '{}'; expected one of: fs | http",
            other
        ),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve settings from the loaded config, CLI overrides and the process
/// environment.
pub fn resolve_settings(config_json: &Value, overrides: &SettingsOverrides) -> Result<RegistrySettings> {
    resolve_settings_with_env(config_json, overrides, &process_env)
}

/// Same as [`resolve_settings`] with an injectable environment lookup.
///
/// # Errors
/// - entity or project missing from every layer;
/// - an `http` backend without an api key (reports the env var NAME);
/// - an invalid `store` section.
pub fn resolve_settings_with_env(
    config_json: &Value,
    overrides: &SettingsOverrides,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<RegistrySettings> {
    let entity = non_blank(overrides.entity.clone())
        .or_else(|| non_blank(env(ENV_ENTITY)))
        .or_else(|| read_str_at(config_json, "/registry/entity"));
    let Some(entity) = entity else {
        bail!(
            "SETTINGS_MISSING: registry entity not set (use --entity, env var '{}', or registry.entity)",
            ENV_ENTITY
        );
    };

    let project = non_blank(overrides.project.clone())
        .or_else(|| non_blank(env(ENV_PROJECT)))
        .or_else(|| read_str_at(config_json, "/registry/project"));
    let Some(project) = project else {
        bail!(
            "SETTINGS_MISSING: registry project not set (use --project, env var '{}', or registry.project)",
            ENV_PROJECT
        );
    };

    let api_key_env =
        read_str_at(config_json, "/registry/api_key_env").unwrap_or_else(|| ENV_API_KEY.to_string());
    let api_key = non_blank(env(&api_key_env));

    let backend = resolve_backend(config_json, overrides, env)?;
    if matches!(backend, StoreBackend::Http { .. }) && api_key.is_none() {
        bail!(
            "SECRETS_MISSING backend=http: required env var '{}' (registry api key) is not set or empty",
            api_key_env
        );
    }

    Ok(RegistrySettings {
        entity,
        project,
        api_key,
        api_key_env,
        backend,
    })
}
