use mreg_artifacts::{Artifact, LATEST_ALIAS};

use crate::types::{SelectionCriterion, Selection};

// ============================================================================
// Best-artifact selector
// ============================================================================

/// Pick the artifact with the best value of `criterion.metric_name`.
///
/// Artifacts whose metadata lacks the metric (or holds a non-numeric value)
/// do not compete. Replacement requires a strict improvement, so on a tie
/// the artifact seen first in collection order wins. Returns `None` when no
/// artifact qualifies.
pub fn select_best(artifacts: &[Artifact], criterion: &SelectionCriterion) -> Option<Selection> {
    let direction = criterion.direction;
    let mut best_value = direction.initial();
    let mut best: Option<Selection> = None;

    for (index, artifact) in artifacts.iter().enumerate() {
        let Some(value) = artifact.metadata.metric(&criterion.metric_name) else {
            continue;
        };
        if direction.improves(value, best_value) {
            best_value = value;
            best = Some(Selection { index, value });
        }
    }

    best
}

// ============================================================================
// Latest-artifact locator
// ============================================================================

/// Index of the first artifact carrying the `latest` alias.
///
/// Only one version should hold `latest`, but nothing prevents several; the
/// first in collection order is returned in that case.
pub fn find_latest(artifacts: &[Artifact]) -> Option<usize> {
    artifacts.iter().position(|a| a.has_alias(LATEST_ALIAS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mreg_artifacts::Metadata;

    fn art(version: u32, metric: Option<f64>) -> Artifact {
        let md = match metric {
            Some(v) => Metadata::new().with("accuracy", v),
            None => Metadata::new(),
        };
        Artifact::new("acme", "mnist", "m", version, md)
    }

    fn maximize() -> SelectionCriterion {
        SelectionCriterion::maximize("accuracy").unwrap()
    }

    fn minimize() -> SelectionCriterion {
        SelectionCriterion::minimize("accuracy").unwrap()
    }

    #[test]
    fn empty_collection_selects_nothing() {
        assert!(select_best(&[], &maximize()).is_none());
        assert!(find_latest(&[]).is_none());
    }

    #[test]
    fn picks_maximum_and_minimum() {
        let arts = vec![art(0, Some(0.7)), art(1, Some(0.9)), art(2, Some(0.8))];
        assert_eq!(select_best(&arts, &maximize()).map(|s| s.index), Some(1));
        assert_eq!(select_best(&arts, &minimize()).map(|s| s.index), Some(0));
    }

    #[test]
    fn artifacts_without_metric_do_not_compete() {
        let arts = vec![art(0, None), art(1, Some(-5.0)), art(2, None)];
        let sel = select_best(&arts, &maximize()).unwrap();
        assert_eq!(sel.index, 1);
        assert_eq!(sel.value, -5.0);
    }

    #[test]
    fn no_artifact_with_metric_is_none() {
        let arts = vec![art(0, None), art(1, None)];
        assert!(select_best(&arts, &maximize()).is_none());
    }

    #[test]
    fn ties_keep_the_first_seen() {
        let arts = vec![art(0, Some(0.5)), art(1, Some(0.9)), art(2, Some(0.9))];
        assert_eq!(select_best(&arts, &maximize()).map(|s| s.index), Some(1));

        let arts = vec![art(0, Some(0.1)), art(1, Some(0.1))];
        assert_eq!(select_best(&arts, &minimize()).map(|s| s.index), Some(0));
    }

    #[test]
    fn nan_values_are_never_selected() {
        let arts = vec![art(0, Some(f64::NAN)), art(1, Some(0.2))];
        assert_eq!(select_best(&arts, &maximize()).map(|s| s.index), Some(1));

        let only_nan = vec![art(0, Some(f64::NAN))];
        assert!(select_best(&only_nan, &maximize()).is_none());
    }

    #[test]
    fn latest_locator_returns_first_match() {
        let arts = vec![
            art(0, None),
            art(1, None).with_aliases(["latest"]),
            art(2, None).with_aliases(["latest"]),
        ];
        assert_eq!(find_latest(&arts), Some(1));
        assert_eq!(find_latest(&arts[..1]), None);
    }
}
