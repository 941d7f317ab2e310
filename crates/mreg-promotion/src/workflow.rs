//! The registry commands, expressed over an injected [`ArtifactStore`].
//!
//! Each workflow performs at most one scan-select-promote sequence. Input
//! and lookup problems come back as validation variants of
//! [`PromotionError`]; store failures are propagated untouched.

use mreg_artifacts::{segment_problem, ArtifactRef, ArtifactStore, RegistryPath, StoreError};
use tracing::info;

use crate::promoter::promote;
use crate::selector::{find_latest, select_best};
use crate::types::{
    PromotionError, PromotionOutcome, PromotionTarget, SelectionCriterion, STAGE_BEST_ALIASES,
};

/// Outcome of [`stage_best_model`], with the winning metric value.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedBest {
    pub outcome: PromotionOutcome,
    pub value: f64,
}

/// Trimmed model name, usable as a collection key and registry path segment.
fn require_model_name(model_name: &str) -> Result<&str, PromotionError> {
    let trimmed = model_name.trim();
    match segment_problem(trimmed) {
        Some(problem) => Err(PromotionError::InvalidInput(format!(
            "model name '{model_name}' {problem}"
        ))),
        None => Ok(trimmed),
    }
}

/// Select the best version of `model_name` by `criterion` and link it into
/// `{entity}/model-registry/{model_name}` as `best` + `staging`.
pub fn stage_best_model(
    store: &dyn ArtifactStore,
    entity: &str,
    model_name: &str,
    criterion: &SelectionCriterion,
) -> Result<StagedBest, PromotionError> {
    let model_name = require_model_name(model_name)?;
    let target = PromotionTarget::new(RegistryPath::new(entity, model_name), STAGE_BEST_ALIASES)?;

    let mut artifacts = store.list_collection(model_name)?;
    let selection = select_best(&artifacts, criterion).ok_or_else(|| {
        PromotionError::NotFound(format!(
            "no version of '{model_name}' records metric '{}'",
            criterion.metric_name
        ))
    })?;

    let best = &mut artifacts[selection.index];
    info!(
        artifact = %best.name(),
        metric = %criterion.metric_name,
        value = selection.value,
        "best model found in registry"
    );

    let outcome = promote(store, best, &target)?;
    Ok(StagedBest {
        outcome,
        value: selection.value,
    })
}

/// Link the version of `model_name` tagged `latest` under `aliases`.
pub fn link_latest_model(
    store: &dyn ArtifactStore,
    entity: &str,
    model_name: &str,
    aliases: &[String],
) -> Result<PromotionOutcome, PromotionError> {
    let model_name = require_model_name(model_name)?;
    let target = PromotionTarget::new(RegistryPath::new(entity, model_name), aliases.iter().cloned())?;

    let mut artifacts = store.list_collection(model_name)?;
    let idx = find_latest(&artifacts).ok_or_else(|| {
        PromotionError::NotFound(format!("no version of '{model_name}' is tagged latest"))
    })?;

    promote(store, &mut artifacts[idx], &target)
}

/// Name (`collection:vN`) of the version of `model_name` tagged `latest`.
pub fn latest_model_name(
    store: &dyn ArtifactStore,
    model_name: &str,
) -> Result<String, PromotionError> {
    let model_name = require_model_name(model_name)?;
    let artifacts = store.list_collection(model_name)?;
    find_latest(&artifacts)
        .map(|i| artifacts[i].name())
        .ok_or_else(|| {
            PromotionError::NotFound(format!("no version of '{model_name}' is tagged latest"))
        })
}

/// Link the artifact named by `artifact_path` (`entity/project/name:version`)
/// into `{entity}/model-registry/{name}` under `aliases`.
///
/// The entity and project inside the reference only locate the source
/// artifact; the registry entity comes from the caller.
pub fn link_model(
    store: &dyn ArtifactStore,
    entity: &str,
    artifact_path: &str,
    aliases: &[String],
) -> Result<PromotionOutcome, PromotionError> {
    if artifact_path.trim().is_empty() {
        return Err(PromotionError::InvalidInput(
            "please provide an artifact path".to_string(),
        ));
    }
    let reference = ArtifactRef::parse(artifact_path)?;
    let target = PromotionTarget::new(
        RegistryPath::new(entity, reference.name.clone()),
        aliases.iter().cloned(),
    )?;

    let mut artifact = match store.fetch(&reference) {
        Ok(a) => a,
        Err(StoreError::NotFound(what)) => return Err(PromotionError::NotFound(what)),
        Err(e) => return Err(e.into()),
    };

    promote(store, &mut artifact, &target)
}
