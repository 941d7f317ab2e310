//! Artifact references (`entity/project/name:version`) and registry paths
//! (`entity/model-registry/model`).

use std::fmt;

/// Path segment that separates an entity from its registered models.
pub const MODEL_REGISTRY_SEGMENT: &str = "model-registry";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The string does not have the expected delimiters or has empty parts.
    Malformed { reference: String, reason: String },
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceError::Malformed { reference, reason } => {
                write!(f, "malformed reference '{reference}': {reason}")
            }
        }
    }
}

impl std::error::Error for ReferenceError {}

/// Why `part` cannot serve as one path component (entity, project or model
/// name), or `None` if it can.
pub fn segment_problem(part: &str) -> Option<&'static str> {
    if part.trim().is_empty() {
        Some("is empty")
    } else if part == "." || part == ".." {
        Some("must not be '.' or '..'")
    } else if part.contains(['/', '\\', '\0']) {
        Some("must not contain '/', '\\' or NUL")
    } else {
        None
    }
}

fn malformed(reference: &str, reason: &str) -> ReferenceError {
    ReferenceError::Malformed {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Version spec
// ---------------------------------------------------------------------------

/// Right-hand side of `name:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    /// `3` or `v3`.
    Number(u32),
    /// Anything else, resolved through the alias set (e.g. `latest`).
    Alias(String),
}

impl VersionSpec {
    pub fn parse(s: &str) -> Self {
        let digits = s.strip_prefix('v').unwrap_or(s);
        match digits.parse::<u32>() {
            Ok(n) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                VersionSpec::Number(n)
            }
            _ => VersionSpec::Alias(s.to_string()),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Number(n) => write!(f, "v{n}"),
            VersionSpec::Alias(a) => f.write_str(a),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact reference
// ---------------------------------------------------------------------------

/// A fully qualified pointer at one artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub entity: String,
    pub project: String,
    pub name: String,
    pub version: VersionSpec,
}

impl ArtifactRef {
    /// Parse `entity/project/artifact_name:version`.
    ///
    /// Requires exactly two `/`, exactly one `:` in the last segment, and
    /// no empty component.
    pub fn parse(reference: &str) -> Result<Self, ReferenceError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(malformed(reference, "reference is empty"));
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        let [entity, project, tail] = segments.as_slice() else {
            return Err(malformed(
                reference,
                "expected exactly two '/' (entity/project/name:version)",
            ));
        };

        if tail.matches(':').count() != 1 {
            return Err(malformed(
                reference,
                "expected exactly one ':' in the final segment (name:version)",
            ));
        }
        let Some((name, version)) = tail.split_once(':') else {
            return Err(malformed(reference, "missing ':' in the final segment"));
        };

        for (label, part) in [
            ("entity", *entity),
            ("project", *project),
            ("artifact name", name),
        ] {
            if let Some(problem) = segment_problem(part) {
                return Err(malformed(reference, &format!("{label} {problem}")));
            }
        }
        if version.trim().is_empty() {
            return Err(malformed(reference, "version is empty"));
        }

        Ok(Self {
            entity: entity.to_string(),
            project: project.to_string(),
            name: name.to_string(),
            version: VersionSpec::parse(version),
        })
    }

    pub fn for_version(
        entity: impl Into<String>,
        project: impl Into<String>,
        name: impl Into<String>,
        version: u32,
    ) -> Self {
        Self {
            entity: entity.into(),
            project: project.into(),
            name: name.into(),
            version: VersionSpec::Number(version),
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}",
            self.entity, self.project, self.name, self.version
        )
    }
}

// ---------------------------------------------------------------------------
// Registry path
// ---------------------------------------------------------------------------

/// Link target inside the registry namespace: `{entity}/model-registry/{model_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryPath {
    pub entity: String,
    pub model_name: String,
}

impl RegistryPath {
    pub fn new(entity: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            model_name: model_name.into(),
        }
    }

    pub fn parse(path: &str) -> Result<Self, ReferenceError> {
        let segments: Vec<&str> = path.trim().split('/').collect();
        match segments.as_slice() {
            [entity, MODEL_REGISTRY_SEGMENT, model]
                if !entity.is_empty() && !model.is_empty() =>
            {
                Ok(Self::new(*entity, *model))
            }
            _ => Err(malformed(
                path,
                "expected {entity}/model-registry/{model_name}",
            )),
        }
    }
}

impl fmt::Display for RegistryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.entity, MODEL_REGISTRY_SEGMENT, self.model_name
        )
    }
}
