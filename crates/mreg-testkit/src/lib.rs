//! Fixtures and fault injection for registry scenario tests.
//!
//! Nothing here ships in the `mreg` binary.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use mreg_artifacts::{
    Artifact, ArtifactRef, ArtifactStore, FsStore, Metadata, RegistryPath, StoreError,
};
use tempfile::TempDir;
use tracing::warn;

pub const TEST_ENTITY: &str = "acme";
pub const TEST_PROJECT: &str = "mnist";

/// Metadata with a single `accuracy` value, or none at all.
pub fn accuracy(value: Option<f64>) -> Metadata {
    match value {
        Some(v) => Metadata::new().with("accuracy", v),
        None => Metadata::new(),
    }
}

/// A directory-backed store rooted in a temp dir that lives as long as this.
pub struct TempRegistry {
    pub dir: TempDir,
    pub store: FsStore,
}

impl TempRegistry {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp registry dir")?;
        let store = FsStore::new(dir.path(), TEST_ENTITY, TEST_PROJECT);
        Ok(Self { dir, store })
    }

    /// Publish one version of `collection` per entry, in order.
    pub fn seed(&self, collection: &str, versions: &[Metadata]) -> Result<Vec<Artifact>> {
        versions
            .iter()
            .map(|m| {
                self.store
                    .publish(collection, m.clone())
                    .with_context(|| format!("seed {collection}"))
            })
            .collect()
    }

    /// Reload one stored version from disk.
    pub fn reload(&self, collection: &str, version: u32) -> Result<Artifact> {
        let reference = ArtifactRef::parse(&format!(
            "{TEST_ENTITY}/{TEST_PROJECT}/{collection}:v{version}"
        ))?;
        Ok(self.store.fetch(&reference)?)
    }
}

/// Which store call a [`FaultyStore`] breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Link,
    Save,
}

/// Wraps a store and fails the chosen call the first `failures` times.
///
/// Models a registry that goes away between the link and the save of a
/// promotion.
pub struct FaultyStore<S> {
    inner: S,
    fault: Fault,
    remaining: AtomicUsize,
}

impl<S: ArtifactStore> FaultyStore<S> {
    pub fn new(inner: S, fault: Fault, failures: usize) -> Self {
        Self {
            inner,
            fault,
            remaining: AtomicUsize::new(failures),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn trip(&self, call: Fault) -> Result<(), StoreError> {
        if call != self.fault {
            return Ok(());
        }
        let tripped = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            warn!(call = ?call, "injected store fault");
            return Err(StoreError::Api {
                status: 503,
                message: "injected fault".to_string(),
            });
        }
        Ok(())
    }
}

impl<S: ArtifactStore> ArtifactStore for FaultyStore<S> {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn list_collection(&self, collection: &str) -> Result<Vec<Artifact>, StoreError> {
        self.inner.list_collection(collection)
    }

    fn fetch(&self, reference: &ArtifactRef) -> Result<Artifact, StoreError> {
        self.inner.fetch(reference)
    }

    fn link(
        &self,
        artifact: &Artifact,
        target: &RegistryPath,
        aliases: &[String],
    ) -> Result<(), StoreError> {
        self.trip(Fault::Link)?;
        self.inner.link(artifact, target, aliases)
    }

    fn save(&self, artifact: &Artifact) -> Result<(), StoreError> {
        self.trip(Fault::Save)?;
        self.inner.save(artifact)
    }
}
