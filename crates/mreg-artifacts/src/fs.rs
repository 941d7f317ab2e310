//! Directory-backed registry.
//!
//! Layout under the store root:
//!
//! ```text
//! {entity}/{project}/{collection}/v{N}.json     one artifact per version
//! {entity}/model-registry/{model}.json          one portfolio per registered model
//! ```
//!
//! Every write goes through a sibling temp file and `rename`, so a reader
//! never observes a half-written document. Link and save are separate writes;
//! a crash between them leaves a partially promoted state that a retry repairs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::reference::{
    segment_problem, ArtifactRef, RegistryPath, VersionSpec, MODEL_REGISTRY_SEGMENT,
};
use crate::registry::Portfolio;
use crate::store::{resolve_version, stage_next_version, ArtifactStore, StoreError};
use crate::types::{Artifact, Metadata};

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    /// Scope used by `list_collection` and `publish`.
    entity: String,
    project: String,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>, entity: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            entity: entity.into(),
            project: project.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, entity: &str, project: &str, collection: &str) -> Result<PathBuf, StoreError> {
        Ok(self
            .root
            .join(checked_segment(entity)?)
            .join(checked_segment(project)?)
            .join(checked_segment(collection)?))
    }

    fn artifact_path(&self, artifact: &Artifact) -> Result<PathBuf, StoreError> {
        Ok(self
            .collection_dir(&artifact.entity, &artifact.project, &artifact.collection)?
            .join(format!("v{}.json", artifact.version)))
    }

    pub fn portfolio_path(&self, target: &RegistryPath) -> Result<PathBuf, StoreError> {
        Ok(self
            .root
            .join(checked_segment(&target.entity)?)
            .join(MODEL_REGISTRY_SEGMENT)
            .join(format!("{}.json", checked_segment(&target.model_name)?)))
    }

    fn list_in(&self, entity: &str, project: &str, collection: &str) -> Result<Vec<Artifact>, StoreError> {
        let dir = self.collection_dir(entity, project, collection)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
        let mut out = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_err(&dir, e))?.path();
            if is_version_file(&path) {
                out.push(read_json::<Artifact>(&path)?);
            }
        }
        // Versions are assigned monotonically, so version order is creation order.
        out.sort_by_key(|a| a.version);
        Ok(out)
    }

    /// Read the portfolio behind `target`, if one was ever written.
    pub fn portfolio(&self, target: &RegistryPath) -> Result<Option<Portfolio>, StoreError> {
        let path = self.portfolio_path(target)?;
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Publish a new version of `collection` in this store's scope.
    pub fn publish(&self, collection: &str, metadata: Metadata) -> Result<Artifact, StoreError> {
        let mut existing = self.list_in(&self.entity, &self.project, collection)?;
        let (artifact, demoted) =
            stage_next_version(&mut existing, &self.entity, &self.project, collection, metadata);

        write_json_atomic(&self.artifact_path(&artifact)?, &artifact)?;
        for i in demoted {
            write_json_atomic(&self.artifact_path(&existing[i])?, &existing[i])?;
        }

        info!(artifact = %artifact.qualified_name(), digest = %artifact.digest, "artifact published");
        Ok(artifact)
    }
}

impl ArtifactStore for FsStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn list_collection(&self, collection: &str) -> Result<Vec<Artifact>, StoreError> {
        self.list_in(&self.entity, &self.project, collection)
    }

    fn fetch(&self, reference: &ArtifactRef) -> Result<Artifact, StoreError> {
        let found = match &reference.version {
            VersionSpec::Number(n) => {
                let path = self
                    .collection_dir(&reference.entity, &reference.project, &reference.name)?
                    .join(format!("v{n}.json"));
                if path.is_file() {
                    Some(read_json::<Artifact>(&path)?)
                } else {
                    None
                }
            }
            spec @ VersionSpec::Alias(_) => {
                let versions = self.list_in(&reference.entity, &reference.project, &reference.name)?;
                resolve_version(&versions, spec).cloned()
            }
        };
        found.ok_or_else(|| StoreError::NotFound(reference.to_string()))
    }

    fn link(
        &self,
        artifact: &Artifact,
        target: &RegistryPath,
        aliases: &[String],
    ) -> Result<(), StoreError> {
        if !self.artifact_path(artifact)?.is_file() {
            return Err(StoreError::NotFound(artifact.qualified_name()));
        }

        let path = self.portfolio_path(target)?;
        let mut portfolio = self.portfolio(target)?.unwrap_or_else(|| Portfolio::new(target));
        let change = portfolio.link(artifact, aliases);
        write_json_atomic(&path, &portfolio)?;

        for (alias, from) in &change.moved {
            debug!(alias = %alias, from = %from, to = %artifact.qualified_name(), "registry alias moved");
        }
        debug!(target = %target, created = change.created, "portfolio written");
        Ok(())
    }

    fn save(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let path = self.artifact_path(artifact)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(artifact.qualified_name()));
        }
        write_json_atomic(&path, artifact)
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// `part` as a single directory or file name under the root.
fn checked_segment(part: &str) -> Result<&str, StoreError> {
    match segment_problem(part) {
        Some(problem) => Err(StoreError::InvalidName(format!("'{part}' {problem}"))),
        None => Ok(part),
    }
}

fn is_version_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.strip_prefix('v')
        .and_then(|rest| rest.strip_suffix(".json"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn io_err(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io(format!("{}: {e}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let raw = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&raw).map_err(|e| StoreError::Decode(format!("{}: {e}", path.display())))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| StoreError::Decode(format!("serialize {}: {e}", path.display())))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, format!("{json}\n")).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_err(path, e))
}
