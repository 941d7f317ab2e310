//! Publish, stage, relink on a directory-backed registry, reopened between
//! steps the way separate CLI invocations would see it.

use mreg_artifacts::{FsStore, RegistryPath};
use mreg_promotion::{latest_model_name, link_latest_model, link_model, stage_best_model, SelectionCriterion};
use mreg_testkit::{accuracy, TempRegistry, TEST_ENTITY, TEST_PROJECT};

#[test]
fn scenario_registry_lifecycle_across_reopen() -> anyhow::Result<()> {
    let reg = TempRegistry::new()?;
    reg.seed("clf", &[accuracy(Some(0.7)), accuracy(Some(0.8))])?;
    let target = RegistryPath::new(TEST_ENTITY, "clf");

    let criterion = SelectionCriterion::maximize("accuracy")?;
    let staged = stage_best_model(&reg.store, TEST_ENTITY, "clf", &criterion)?;
    assert_eq!(staged.outcome.artifact_name, "clf:v1");

    // A new, better version arrives; it becomes latest.
    reg.store.publish("clf", accuracy(Some(0.9)))?;

    let reopened = FsStore::new(reg.dir.path(), TEST_ENTITY, TEST_PROJECT);
    assert_eq!(latest_model_name(&reopened, "clf")?, "clf:v2");

    link_latest_model(&reopened, TEST_ENTITY, "clf", &["staging".to_string()])?;
    let portfolio = reopened.portfolio(&target)?.expect("portfolio");
    assert_eq!(portfolio.links.len(), 2);
    let staging = portfolio.resolve_alias("staging").expect("staging alias");
    assert_eq!(staging.source, format!("{TEST_ENTITY}/{TEST_PROJECT}/clf:v2"));
    // best stays on v1 in the registry.
    let best = portfolio.resolve_alias("best").expect("best alias");
    assert_eq!(best.source, format!("{TEST_ENTITY}/{TEST_PROJECT}/clf:v1"));

    // Source artifacts only gain aliases.
    assert!(reg.reload("clf", 1)?.has_alias("staging"));
    assert!(reg.reload("clf", 2)?.has_alias("staging"));

    // Direct path back to v0 under a fresh alias.
    let path = format!("{TEST_ENTITY}/{TEST_PROJECT}/clf:v0");
    let outcome = link_model(&reopened, TEST_ENTITY, &path, &["baseline".to_string()])?;
    assert_eq!(outcome.target, target.to_string());
    assert!(reg.reload("clf", 0)?.has_alias("baseline"));
    Ok(())
}
