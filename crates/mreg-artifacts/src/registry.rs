//! Registry portfolios: the link-target side of a promotion.
//!
//! A portfolio is the state behind one [`RegistryPath`]. Every store keeps
//! one portfolio per registered model and applies links through
//! [`Portfolio::link`] so alias semantics are identical across backends:
//!
//! - linking the same artifact again unions aliases into its existing link;
//! - an alias names at most one link per portfolio, so attaching it moves it
//!   off whichever link held it before.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reference::RegistryPath;
use crate::types::Artifact;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryLink {
    pub artifact_id: Uuid,
    /// Qualified name of the source artifact (`entity/project/name:vN`).
    pub source: String,
    pub aliases: BTreeSet<String>,
    pub linked_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub target: String,
    #[serde(default)]
    pub links: Vec<RegistryLink>,
}

/// What a single [`Portfolio::link`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkChange {
    /// True when the artifact had no link in this portfolio before.
    pub created: bool,
    /// Aliases newly attached to the artifact's link.
    pub attached: Vec<String>,
    /// `(alias, previous source)` for aliases taken from another link.
    pub moved: Vec<(String, String)>,
}

impl Portfolio {
    pub fn new(target: &RegistryPath) -> Self {
        Self {
            target: target.to_string(),
            links: Vec::new(),
        }
    }

    pub fn find(&self, artifact_id: Uuid) -> Option<&RegistryLink> {
        self.links.iter().find(|l| l.artifact_id == artifact_id)
    }

    /// Link holding `alias`, if any.
    pub fn resolve_alias(&self, alias: &str) -> Option<&RegistryLink> {
        self.links.iter().find(|l| l.aliases.contains(alias))
    }

    pub fn link(&mut self, artifact: &Artifact, aliases: &[String]) -> LinkChange {
        let mut change = LinkChange::default();

        for other in self
            .links
            .iter_mut()
            .filter(|l| l.artifact_id != artifact.id)
        {
            for alias in aliases {
                if other.aliases.remove(alias) {
                    change.moved.push((alias.clone(), other.source.clone()));
                }
            }
        }

        let idx = match self.links.iter().position(|l| l.artifact_id == artifact.id) {
            Some(i) => i,
            None => {
                change.created = true;
                self.links.push(RegistryLink {
                    artifact_id: artifact.id,
                    source: artifact.qualified_name(),
                    aliases: BTreeSet::new(),
                    linked_at_utc: Utc::now(),
                });
                self.links.len() - 1
            }
        };

        let link = &mut self.links[idx];
        for alias in aliases {
            if link.aliases.insert(alias.clone()) {
                change.attached.push(alias.clone());
            }
        }

        change
    }
}
