use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mreg_artifacts::{ReferenceError, RegistryPath, StoreError};
use serde::{Deserialize, Serialize};

/// Aliases `stage-best-model-to-registry` attaches.
pub const STAGE_BEST_ALIASES: [&str; 2] = ["best", "staging"];

/// Default alias for the link commands.
pub const DEFAULT_LINK_ALIAS: &str = "staging";

pub const DEFAULT_METRIC: &str = "accuracy";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PromotionError {
    /// No artifact qualified (selector/locator came back empty, or the
    /// referenced artifact does not exist).
    NotFound(String),
    /// Direct-path reference could not be parsed.
    MalformedReference(ReferenceError),
    /// Caller-supplied input failed validation (blank metric, no aliases, ...).
    InvalidInput(String),
    /// The store failed; nothing here compensates for it.
    Store(StoreError),
}

impl PromotionError {
    /// Validation failures are reported and swallowed by the CLI; only store
    /// failures escape as a failed process.
    pub fn is_validation(&self) -> bool {
        !matches!(self, PromotionError::Store(_))
    }
}

impl fmt::Display for PromotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromotionError::NotFound(what) => write!(f, "no model found: {what}"),
            PromotionError::MalformedReference(e) => write!(f, "{e}"),
            PromotionError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            PromotionError::Store(e) => write!(f, "store failure: {e}"),
        }
    }
}

impl std::error::Error for PromotionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PromotionError::MalformedReference(e) => Some(e),
            PromotionError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for PromotionError {
    fn from(e: StoreError) -> Self {
        PromotionError::Store(e)
    }
}

impl From<ReferenceError> for PromotionError {
    fn from(e: ReferenceError) -> Self {
        PromotionError::MalformedReference(e)
    }
}

// ---------------------------------------------------------------------------
// Selection criterion
// ---------------------------------------------------------------------------

/// Which end of the metric range wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    pub fn from_higher_is_better(higher_is_better: bool) -> Self {
        if higher_is_better {
            Direction::Maximize
        } else {
            Direction::Minimize
        }
    }

    /// Starting value for the running best: every real value beats it.
    pub fn initial(self) -> f64 {
        match self {
            Direction::Maximize => f64::NEG_INFINITY,
            Direction::Minimize => f64::INFINITY,
        }
    }

    /// Strict improvement test. Equal values do not improve (first one seen
    /// keeps the lead) and NaN never improves.
    pub fn improves(self, candidate: f64, best: f64) -> bool {
        match self {
            Direction::Maximize => candidate > best,
            Direction::Minimize => candidate < best,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriterion {
    pub metric_name: String,
    pub direction: Direction,
}

impl SelectionCriterion {
    pub fn new(metric_name: impl Into<String>, direction: Direction) -> Result<Self, PromotionError> {
        let metric_name = metric_name.into();
        if metric_name.trim().is_empty() {
            return Err(PromotionError::InvalidInput(
                "metric name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            metric_name,
            direction,
        })
    }

    pub fn maximize(metric_name: impl Into<String>) -> Result<Self, PromotionError> {
        Self::new(metric_name, Direction::Maximize)
    }

    pub fn minimize(metric_name: impl Into<String>) -> Result<Self, PromotionError> {
        Self::new(metric_name, Direction::Minimize)
    }
}

/// Winner of a selector run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// Position in the scanned collection.
    pub index: usize,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Promotion target / outcome
// ---------------------------------------------------------------------------

/// Where to link and under which aliases. Aliases are non-empty, non-blank
/// and de-duplicated in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionTarget {
    path: RegistryPath,
    aliases: Vec<String>,
}

impl PromotionTarget {
    pub fn new<I, S>(path: RegistryPath, aliases: I) -> Result<Self, PromotionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for alias in aliases {
            let alias = alias.into();
            let alias = alias.trim();
            if alias.is_empty() {
                return Err(PromotionError::InvalidInput(
                    "alias must not be empty".to_string(),
                ));
            }
            if !out.iter().any(|a| a == alias) {
                out.push(alias.to_string());
            }
        }
        if out.is_empty() {
            return Err(PromotionError::InvalidInput(
                "at least one alias is required".to_string(),
            ));
        }
        Ok(Self { path, aliases: out })
    }

    pub fn path(&self) -> &RegistryPath {
        &self.path
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// Result of a completed promotion (link and save both succeeded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionOutcome {
    /// `collection:vN` of the promoted artifact.
    pub artifact_name: String,
    /// Qualified source (`entity/project/collection:vN`).
    pub source: String,
    pub target: String,
    /// Aliases requested for this promotion.
    pub aliases: Vec<String>,
    /// Subset of `aliases` the artifact did not carry before.
    pub aliases_added: Vec<String>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Promotion record written next to a CLI run (serializable to JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionReport {
    pub command: String,
    pub store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criterion: Option<SelectionCriterion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_value: Option<f64>,
    pub outcome: PromotionOutcome,
    pub created_at_utc: DateTime<Utc>,
}

/// Write the report as pretty-printed JSON to `out_dir/promotion_report.json`.
/// Returns the path written.
pub fn write_promotion_report_json(out_dir: &Path, report: &PromotionReport) -> io::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join("promotion_report.json");
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_initial_is_beaten_by_first_value() {
        assert!(Direction::Maximize.improves(-1e300, Direction::Maximize.initial()));
        assert!(Direction::Minimize.improves(1e300, Direction::Minimize.initial()));
    }

    #[test]
    fn direction_is_strict() {
        assert!(!Direction::Maximize.improves(0.5, 0.5));
        assert!(!Direction::Minimize.improves(0.5, 0.5));
        assert!(Direction::Maximize.improves(0.6, 0.5));
        assert!(Direction::Minimize.improves(0.4, 0.5));
    }

    #[test]
    fn nan_never_improves() {
        assert!(!Direction::Maximize.improves(f64::NAN, f64::NEG_INFINITY));
        assert!(!Direction::Minimize.improves(f64::NAN, f64::INFINITY));
    }

    #[test]
    fn blank_metric_is_rejected() {
        assert!(matches!(
            SelectionCriterion::maximize("  "),
            Err(PromotionError::InvalidInput(_))
        ));
        assert!(SelectionCriterion::minimize("val_loss").is_ok());
    }

    #[test]
    fn target_dedups_and_validates_aliases() {
        let path = RegistryPath::new("acme", "m");
        let t = PromotionTarget::new(path.clone(), ["best", "staging", "best"]).unwrap();
        assert_eq!(t.aliases(), ["best".to_string(), "staging".to_string()]);

        assert!(PromotionTarget::new(path.clone(), Vec::<String>::new()).is_err());
        assert!(PromotionTarget::new(path, ["staging", " "]).is_err());
    }

    #[test]
    fn only_store_errors_escape() {
        assert!(PromotionError::NotFound("m".into()).is_validation());
        assert!(PromotionError::InvalidInput("x".into()).is_validation());
        assert!(!PromotionError::Store(StoreError::Io("disk".into())).is_validation());
    }
}
