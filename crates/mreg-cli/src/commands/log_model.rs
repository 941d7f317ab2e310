//! `mreg log-model`: publish a version the way a training run would.

use anyhow::{bail, Context as _, Result};
use mreg_artifacts::{segment_problem, FsStore, Metadata};
use mreg_config::StoreBackend;

use super::Context;

/// Parse `key=value` pairs. Non-numeric values are recorded as present but
/// not usable as a metric.
pub fn parse_metrics(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid --metric '{pair}': expected key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid --metric '{pair}': empty key");
        }
        metadata.insert(key, value.trim().parse::<f64>().ok());
    }
    Ok(metadata)
}

pub fn run(ctx: &Context, model_name: &str, metrics: &[String]) -> Result<()> {
    let StoreBackend::Fs { root } = &ctx.settings.backend else {
        bail!("log-model publishes into a local registry; use --store-root or store.backend=fs");
    };
    let model_name = model_name.trim();
    if let Some(problem) = segment_problem(model_name) {
        bail!("invalid model name '{model_name}': {problem}");
    }
    let metadata = parse_metrics(metrics)?;

    let store = FsStore::new(root.clone(), ctx.settings.entity.clone(), ctx.settings.project.clone());
    let artifact = store
        .publish(model_name, metadata)
        .with_context(|| format!("publish {model_name}"))?;

    println!("{}", artifact.name());
    Ok(())
}
