//! In-process store scoped to one entity/project.
//!
//! Used by tests and dry runs; all state lives behind a single mutex.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::reference::{ArtifactRef, RegistryPath};
use crate::registry::Portfolio;
use crate::store::{resolve_version, stage_next_version, ArtifactStore, StoreError};
use crate::types::{Artifact, Metadata};

#[derive(Debug, Default)]
struct MemoryState {
    /// collection -> versions in creation order
    collections: BTreeMap<String, Vec<Artifact>>,
    /// rendered registry path -> portfolio
    portfolios: BTreeMap<String, Portfolio>,
}

#[derive(Debug)]
pub struct MemoryStore {
    entity: String,
    project: String,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(entity: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            project: project.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Io("memory store lock poisoned".to_string()))
    }

    /// Append an artifact exactly as given (no alias bookkeeping).
    pub fn insert(&self, artifact: Artifact) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state
            .collections
            .entry(artifact.collection.clone())
            .or_default()
            .push(artifact);
        Ok(())
    }

    /// Publish a new version of `collection` and move `latest` onto it.
    pub fn publish(&self, collection: &str, metadata: Metadata) -> Result<Artifact, StoreError> {
        let mut state = self.lock()?;
        let versions = state.collections.entry(collection.to_string()).or_default();
        let (artifact, _) =
            stage_next_version(versions, &self.entity, &self.project, collection, metadata);
        versions.push(artifact.clone());
        debug!(artifact = %artifact.qualified_name(), "memory store published");
        Ok(artifact)
    }

    /// Snapshot of the portfolio behind `target`, if anything was linked.
    pub fn portfolio(&self, target: &RegistryPath) -> Result<Option<Portfolio>, StoreError> {
        Ok(self.lock()?.portfolios.get(&target.to_string()).cloned())
    }

    fn in_scope(&self, entity: &str, project: &str) -> bool {
        entity == self.entity && project == self.project
    }
}

impl ArtifactStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn list_collection(&self, collection: &str) -> Result<Vec<Artifact>, StoreError> {
        Ok(self
            .lock()?
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn fetch(&self, reference: &ArtifactRef) -> Result<Artifact, StoreError> {
        if !self.in_scope(&reference.entity, &reference.project) {
            return Err(StoreError::NotFound(reference.to_string()));
        }
        let state = self.lock()?;
        state
            .collections
            .get(&reference.name)
            .and_then(|versions| resolve_version(versions, &reference.version))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))
    }

    fn link(
        &self,
        artifact: &Artifact,
        target: &RegistryPath,
        aliases: &[String],
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let known = self.in_scope(&artifact.entity, &artifact.project)
            && state
                .collections
                .get(&artifact.collection)
                .is_some_and(|v| v.iter().any(|a| a.id == artifact.id));
        if !known {
            return Err(StoreError::NotFound(artifact.qualified_name()));
        }

        let change = state
            .portfolios
            .entry(target.to_string())
            .or_insert_with(|| Portfolio::new(target))
            .link(artifact, aliases);
        debug!(
            artifact = %artifact.qualified_name(),
            target = %target,
            created = change.created,
            "memory store linked"
        );
        Ok(())
    }

    fn save(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let slot = state
            .collections
            .get_mut(&artifact.collection)
            .and_then(|v| v.iter_mut().find(|a| a.id == artifact.id))
            .ok_or_else(|| StoreError::NotFound(artifact.qualified_name()))?;
        *slot = artifact.clone();
        Ok(())
    }
}
