use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Alias the store keeps on the newest version of every collection.
pub const LATEST_ALIAS: &str = "latest";

/// Namespace for deterministic artifact ids (UUIDv5 over the qualified name).
const ARTIFACT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d72_6567_0a11_4c5e_9b1f_3a2e_7c4d_0001);

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Metric metadata attached to an artifact by the run that produced it.
///
/// Keys map to `Some(value)` when the recorded value is numeric and `None`
/// when the key exists but holds anything else (null, text, nested objects).
/// A key that is absent entirely and a key holding a non-numeric value are
/// both "metric absent" from the selector's point of view; see [`Metadata::metric`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(BTreeMap<String, Option<f64>>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric value for `name`, or `None` if absent or non-numeric.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied().flatten()
    }

    /// True if the key exists, numeric or not.
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.0.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, Some(value));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k, Some(v))).collect())
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Registry metadata is free-form; only numbers are metrics.
        let raw: BTreeMap<String, Value> = BTreeMap::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter().map(|(k, v)| (k, v.as_f64())).collect(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// One versioned model checkpoint inside a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub entity: String,
    pub project: String,
    /// Collection (logical model name) this version belongs to.
    pub collection: String,
    pub version: u32,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    /// sha256 over (collection, version, metadata), fixed at publish time.
    #[serde(default)]
    pub digest: String,
    pub created_at_utc: DateTime<Utc>,
}

impl Artifact {
    pub fn new(
        entity: impl Into<String>,
        project: impl Into<String>,
        collection: impl Into<String>,
        version: u32,
        metadata: Metadata,
    ) -> Self {
        let entity = entity.into();
        let project = project.into();
        let collection = collection.into();
        let id = artifact_id(&entity, &project, &collection, version);
        let digest = metadata_digest(&collection, version, &metadata);
        Self {
            id,
            entity,
            project,
            collection,
            version,
            metadata,
            aliases: BTreeSet::new(),
            digest,
            created_at_utc: Utc::now(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// `"{collection}:v{version}"`, the name printed to operators.
    pub fn name(&self) -> String {
        format!("{}:v{}", self.collection, self.version)
    }

    /// `"{entity}/{project}/{collection}:v{version}"`.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}/{}", self.entity, self.project, self.name())
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains(alias)
    }

    /// Union `aliases` into the alias set. Returns the ones that were new.
    pub fn add_aliases(&mut self, aliases: &[String]) -> Vec<String> {
        aliases
            .iter()
            .filter(|a| self.aliases.insert((*a).clone()))
            .cloned()
            .collect()
    }
}

pub fn artifact_id(entity: &str, project: &str, collection: &str, version: u32) -> Uuid {
    let key = format!("{entity}/{project}/{collection}:v{version}");
    Uuid::new_v5(&ARTIFACT_ID_NAMESPACE, key.as_bytes())
}

/// Stable content digest of an artifact's identity and metrics.
pub fn metadata_digest(collection: &str, version: u32, metadata: &Metadata) -> String {
    let doc = serde_json::json!({
        "collection": collection,
        "version": version,
        "metadata": metadata,
    });
    // Value -> bytes cannot fail: keys are strings and non-finite floats render as null.
    let bytes = serde_json::to_vec(&doc).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_non_numeric_values_are_absent_metrics() {
        let raw = r#"{"accuracy": 0.97, "loss": null, "optimizer": "adam", "nested": {"a": 1}}"#;
        let md: Metadata = serde_json::from_str(raw).unwrap();

        assert_eq!(md.len(), 4);
        assert_eq!(md.metric("accuracy"), Some(0.97));
        assert!(md.contains_key("loss"));
        assert_eq!(md.metric("loss"), None);
        assert_eq!(md.metric("optimizer"), None);
        assert_eq!(md.metric("nested"), None);
        assert_eq!(md.metric("missing"), None);
    }

    #[test]
    fn metadata_integers_are_metrics() {
        let md: Metadata = serde_json::from_str(r#"{"epochs": 12}"#).unwrap();
        assert_eq!(md.metric("epochs"), Some(12.0));
    }

    #[test]
    fn name_and_qualified_name() {
        let a = Artifact::new("acme", "mnist", "mnist-model", 3, Metadata::new());
        assert_eq!(a.name(), "mnist-model:v3");
        assert_eq!(a.qualified_name(), "acme/mnist/mnist-model:v3");
    }

    #[test]
    fn id_is_deterministic_per_version() {
        let a = Artifact::new("acme", "mnist", "m", 1, Metadata::new());
        let b = Artifact::new("acme", "mnist", "m", 1, Metadata::new().with("accuracy", 0.5));
        let c = Artifact::new("acme", "mnist", "m", 2, Metadata::new());
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn digest_tracks_metadata() {
        let a = metadata_digest("m", 1, &Metadata::new().with("accuracy", 0.9));
        let b = metadata_digest("m", 1, &Metadata::new().with("accuracy", 0.9));
        let c = metadata_digest("m", 1, &Metadata::new().with("accuracy", 0.91));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn add_aliases_is_a_union() {
        let mut a = Artifact::new("e", "p", "m", 0, Metadata::new()).with_aliases(["latest"]);
        let added = a.add_aliases(&["best".to_string(), "latest".to_string()]);
        assert_eq!(added, vec!["best".to_string()]);
        assert!(a.has_alias("latest"));
        assert!(a.has_alias("best"));

        let again = a.add_aliases(&["best".to_string()]);
        assert!(again.is_empty());
        assert_eq!(a.aliases.len(), 2);
    }

    #[test]
    fn artifact_json_without_optional_fields_parses() {
        let raw = r#"{
            "id": "00000000-0000-0000-0000-000000000000",
            "entity": "e", "project": "p", "collection": "m", "version": 0,
            "created_at_utc": "2026-01-01T00:00:00Z"
        }"#;
        let a: Artifact = serde_json::from_str(raw).unwrap();
        assert!(a.metadata.is_empty());
        assert!(a.aliases.is_empty());
        assert!(a.digest.is_empty());
    }
}
