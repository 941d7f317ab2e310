//! Command handlers for the `mreg` binary.
//!
//! Shared startup (config, settings, store construction) and the
//! validation-error policy live here; each command lives in a submodule.

pub mod log_model;
pub mod registry;

use anyhow::{Context as _, Result};
use mreg_artifacts::{ArtifactStore, FsStore};
use mreg_config::{RegistrySettings, SettingsOverrides, StoreBackend};
use mreg_promotion::PromotionError;
use mreg_store_http::HttpStore;
use tracing::{debug, error};

/// Everything a command needs, built once per invocation.
pub struct Context {
    pub settings: RegistrySettings,
    pub config_hash: String,
    pub store: Box<dyn ArtifactStore>,
}

impl Context {
    pub fn load(config_paths: &[String], overrides: &SettingsOverrides) -> Result<Self> {
        let loaded = if config_paths.is_empty() {
            mreg_config::LoadedConfig::empty()?
        } else {
            let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
            mreg_config::load_layered_yaml(&path_refs)?
        };

        let settings = mreg_config::resolve_settings(&loaded.config_json, overrides)?;
        debug!(settings = ?settings, config_hash = %loaded.config_hash, "settings resolved");

        let store = build_store(&settings)?;
        Ok(Self {
            settings,
            config_hash: loaded.config_hash,
            store,
        })
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }
}

fn build_store(settings: &RegistrySettings) -> Result<Box<dyn ArtifactStore>> {
    match &settings.backend {
        StoreBackend::Fs { root } => Ok(Box::new(FsStore::new(
            root.clone(),
            settings.entity.clone(),
            settings.project.clone(),
        ))),
        StoreBackend::Http { base_url } => {
            let api_key = settings
                .api_key
                .clone()
                .with_context(|| format!("env var '{}' is required for an http registry", settings.api_key_env))?;
            let store = HttpStore::new(
                base_url,
                settings.entity.clone(),
                settings.project.clone(),
                api_key,
            )
            .context("build http registry client")?;
            Ok(Box::new(store))
        }
    }
}

/// Validation failures are logged and the command returns cleanly; store
/// failures propagate and fail the process.
pub fn settle<T>(command: &str, result: Result<T, PromotionError>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_validation() => {
            error!(command, error = %e, "command aborted");
            Ok(None)
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("{command} failed"))),
    }
}
