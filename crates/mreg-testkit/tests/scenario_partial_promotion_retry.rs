//! A promotion whose save fails after the link went through leaves the
//! registry partially promoted. Re-running the same command completes it
//! without duplicating the registry link.

use mreg_artifacts::{ArtifactStore, RegistryPath, StoreError};
use mreg_promotion::{link_latest_model, stage_best_model, PromotionError, SelectionCriterion};
use mreg_testkit::{accuracy, Fault, FaultyStore, TempRegistry, TEST_ENTITY};

#[test]
fn scenario_save_failure_then_retry_completes_promotion() -> anyhow::Result<()> {
    let reg = TempRegistry::new()?;
    reg.seed("mnist-model", &[accuracy(Some(0.90)), accuracy(Some(0.95)), accuracy(None)])?;
    let store = FaultyStore::new(&reg.store, Fault::Save, 1);
    let criterion = SelectionCriterion::maximize("accuracy")?;
    let target = RegistryPath::new(TEST_ENTITY, "mnist-model");

    let err = stage_best_model(&store, TEST_ENTITY, "mnist-model", &criterion).unwrap_err();
    assert!(matches!(err, PromotionError::Store(StoreError::Api { status: 503, .. })));
    assert!(!err.is_validation());

    // Link landed, save did not.
    let portfolio = reg.store.portfolio(&target)?.expect("portfolio written");
    assert_eq!(portfolio.links.len(), 1);
    assert!(!reg.reload("mnist-model", 1)?.has_alias("best"));

    let staged = stage_best_model(&store, TEST_ENTITY, "mnist-model", &criterion)?;
    assert_eq!(staged.outcome.artifact_name, "mnist-model:v1");

    let v1 = reg.reload("mnist-model", 1)?;
    assert!(v1.has_alias("best") && v1.has_alias("staging"));
    let portfolio = reg.store.portfolio(&target)?.expect("portfolio written");
    assert_eq!(portfolio.links.len(), 1);
    assert_eq!(portfolio.resolve_alias("staging").map(|l| l.artifact_id), Some(v1.id));
    Ok(())
}

#[test]
fn scenario_link_failure_leaves_registry_untouched() -> anyhow::Result<()> {
    let reg = TempRegistry::new()?;
    reg.seed("mnist-model", &[accuracy(Some(0.5))])?;
    let store = FaultyStore::new(&reg.store, Fault::Link, 1);

    let err = link_latest_model(&store, TEST_ENTITY, "mnist-model", &["staging".to_string()])
        .unwrap_err();
    assert!(matches!(err, PromotionError::Store(_)));

    assert!(reg
        .store
        .portfolio(&RegistryPath::new(TEST_ENTITY, "mnist-model"))?
        .is_none());
    let v0 = reg.reload("mnist-model", 0)?;
    assert!(!v0.has_alias("staging"));
    assert!(v0.has_alias("latest"));
    assert_eq!(store.inner().list_collection("mnist-model")?.len(), 1);
    Ok(())
}
