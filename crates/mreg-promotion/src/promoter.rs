use mreg_artifacts::{Artifact, ArtifactStore};
use tracing::{debug, info};

use crate::types::{PromotionError, PromotionOutcome, PromotionTarget};

/// Attach `target`'s aliases to `artifact`, link it into the registry and
/// persist it.
///
/// Link and save are two independent store calls with no rollback. If the
/// second one fails the registry is left partially promoted; calling this
/// again with the same target is safe and completes the promotion.
///
/// `artifact.aliases` is only ever extended; metadata is never touched.
pub fn promote(
    store: &dyn ArtifactStore,
    artifact: &mut Artifact,
    target: &PromotionTarget,
) -> Result<PromotionOutcome, PromotionError> {
    let aliases_added = artifact.add_aliases(target.aliases());
    debug!(
        artifact = %artifact.qualified_name(),
        added = ?aliases_added,
        "aliases attached"
    );

    store.link(artifact, target.path(), target.aliases())?;
    store.save(artifact)?;

    info!(
        artifact = %artifact.name(),
        target = %target.path(),
        aliases = ?target.aliases(),
        store = store.name(),
        "model linked to registry"
    );

    Ok(PromotionOutcome {
        artifact_name: artifact.name(),
        source: artifact.qualified_name(),
        target: target.path().to_string(),
        aliases: target.aliases().to_vec(),
        aliases_added,
    })
}
