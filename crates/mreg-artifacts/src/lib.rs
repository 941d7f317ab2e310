//! mreg-artifacts
//!
//! Artifact data model and the store boundary of the model registry.
//! This crate knows how artifacts, references and registry portfolios are
//! shaped and persisted; it does not decide which artifact gets promoted
//! (that is `mreg-promotion`).

pub mod fs;
pub mod memory;
pub mod reference;
pub mod registry;
pub mod store;
mod types;

pub use fs::FsStore;
pub use memory::MemoryStore;
pub use reference::{segment_problem, ArtifactRef, ReferenceError, RegistryPath, VersionSpec};
pub use registry::{LinkChange, Portfolio, RegistryLink};
pub use store::{ArtifactStore, StoreError};
pub use types::{artifact_id, metadata_digest, Artifact, Metadata, LATEST_ALIAS};
