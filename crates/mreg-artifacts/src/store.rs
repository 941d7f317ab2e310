//! Artifact store boundary.
//!
//! The store is the durable registry the promotion workflows read from and
//! write to. Concrete stores live in [`crate::memory`], [`crate::fs`] and the
//! `mreg-store-http` crate; callers hold a `&dyn ArtifactStore`.

use std::fmt;

use crate::reference::{ArtifactRef, RegistryPath, VersionSpec};
use crate::types::{Artifact, Metadata, LATEST_ALIAS};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors an [`ArtifactStore`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced artifact (or portfolio source) does not exist.
    NotFound(String),
    /// A name cannot be mapped onto the store's layout (e.g. `..`).
    InvalidName(String),
    /// Local I/O failure (filesystem stores, poisoned locks).
    Io(String),
    /// A stored or received document could not be decoded.
    Decode(String),
    /// Network or transport failure.
    Transport(String),
    /// The remote registry answered with a non-success status.
    Api { status: u16, message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "not found: {what}"),
            StoreError::InvalidName(msg) => write!(f, "invalid name: {msg}"),
            StoreError::Io(msg) => write!(f, "io error: {msg}"),
            StoreError::Decode(msg) => write!(f, "decode error: {msg}"),
            StoreError::Transport(msg) => write!(f, "transport error: {msg}"),
            StoreError::Api { status, message } => {
                write!(f, "registry api error status={status}: {message}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Registry contract consumed by the promotion workflows.
///
/// Implementations must be object-safe and `Send + Sync`.
pub trait ArtifactStore: Send + Sync {
    /// Short backend name for logs and reports (e.g. `"fs"`).
    fn name(&self) -> &'static str;

    /// All versions of `collection` in creation order. A collection that does
    /// not exist yields an empty list.
    fn list_collection(&self, collection: &str) -> Result<Vec<Artifact>, StoreError>;

    /// Fetch one artifact by fully qualified reference.
    fn fetch(&self, reference: &ArtifactRef) -> Result<Artifact, StoreError>;

    /// Link `artifact` into the registry portfolio at `target` under `aliases`.
    fn link(
        &self,
        artifact: &Artifact,
        target: &RegistryPath,
        aliases: &[String],
    ) -> Result<(), StoreError>;

    /// Persist the artifact's current state (aliases included).
    fn save(&self, artifact: &Artifact) -> Result<(), StoreError>;
}

impl<T: ArtifactStore + ?Sized> ArtifactStore for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn list_collection(&self, collection: &str) -> Result<Vec<Artifact>, StoreError> {
        (**self).list_collection(collection)
    }

    fn fetch(&self, reference: &ArtifactRef) -> Result<Artifact, StoreError> {
        (**self).fetch(reference)
    }

    fn link(
        &self,
        artifact: &Artifact,
        target: &RegistryPath,
        aliases: &[String],
    ) -> Result<(), StoreError> {
        (**self).link(artifact, target, aliases)
    }

    fn save(&self, artifact: &Artifact) -> Result<(), StoreError> {
        (**self).save(artifact)
    }
}

impl<T: ArtifactStore + ?Sized> ArtifactStore for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn list_collection(&self, collection: &str) -> Result<Vec<Artifact>, StoreError> {
        (**self).list_collection(collection)
    }

    fn fetch(&self, reference: &ArtifactRef) -> Result<Artifact, StoreError> {
        (**self).fetch(reference)
    }

    fn link(
        &self,
        artifact: &Artifact,
        target: &RegistryPath,
        aliases: &[String],
    ) -> Result<(), StoreError> {
        (**self).link(artifact, target, aliases)
    }

    fn save(&self, artifact: &Artifact) -> Result<(), StoreError> {
        (**self).save(artifact)
    }
}

// ---------------------------------------------------------------------------
// Shared helpers for collection-backed stores
// ---------------------------------------------------------------------------

/// Resolve a version spec within one collection's versions.
pub fn resolve_version<'a>(artifacts: &'a [Artifact], spec: &VersionSpec) -> Option<&'a Artifact> {
    match spec {
        VersionSpec::Number(n) => artifacts.iter().find(|a| a.version == *n),
        VersionSpec::Alias(alias) => artifacts.iter().find(|a| a.has_alias(alias)),
    }
}

/// Build the next version of a collection and move `latest` onto it.
///
/// Returns the new artifact plus the indices of existing versions that lost
/// the `latest` alias (those must be re-persisted by the caller).
pub fn stage_next_version(
    existing: &mut [Artifact],
    entity: &str,
    project: &str,
    collection: &str,
    metadata: Metadata,
) -> (Artifact, Vec<usize>) {
    let version = existing
        .iter()
        .map(|a| a.version + 1)
        .max()
        .unwrap_or(0);

    let mut demoted = Vec::new();
    for (i, a) in existing.iter_mut().enumerate() {
        if a.aliases.remove(LATEST_ALIAS) {
            demoted.push(i);
        }
    }

    let artifact = Artifact::new(entity, project, collection, version, metadata)
        .with_aliases([LATEST_ALIAS]);
    (artifact, demoted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        assert_eq!(
            StoreError::Api {
                status: 503,
                message: "unavailable".to_string()
            }
            .to_string(),
            "registry api error status=503: unavailable"
        );
        assert_eq!(
            StoreError::NotFound("e/p/m:v1".to_string()).to_string(),
            "not found: e/p/m:v1"
        );
    }

    #[test]
    fn stage_next_version_moves_latest() {
        let mut existing = vec![
            Artifact::new("e", "p", "m", 0, Metadata::new()),
            Artifact::new("e", "p", "m", 1, Metadata::new()).with_aliases(["latest", "best"]),
        ];
        let (next, demoted) = stage_next_version(&mut existing, "e", "p", "m", Metadata::new());

        assert_eq!(next.version, 2);
        assert!(next.has_alias("latest"));
        assert_eq!(demoted, vec![1]);
        assert!(!existing[1].has_alias("latest"));
        assert!(existing[1].has_alias("best"));
    }

    #[test]
    fn stage_first_version_is_zero() {
        let (next, demoted) = stage_next_version(&mut [], "e", "p", "m", Metadata::new());
        assert_eq!(next.version, 0);
        assert!(demoted.is_empty());
    }

    #[test]
    fn resolve_by_number_and_alias() {
        let versions = vec![
            Artifact::new("e", "p", "m", 0, Metadata::new()),
            Artifact::new("e", "p", "m", 1, Metadata::new()).with_aliases(["latest"]),
        ];
        assert_eq!(
            resolve_version(&versions, &VersionSpec::Number(0)).map(|a| a.version),
            Some(0)
        );
        assert_eq!(
            resolve_version(&versions, &VersionSpec::Alias("latest".into())).map(|a| a.version),
            Some(1)
        );
        assert!(resolve_version(&versions, &VersionSpec::Number(7)).is_none());
    }
}
