//! The four registry commands.

use std::path::Path;

use anyhow::{Context as _, Result};
use chrono::Utc;
use mreg_promotion::{
    latest_model_name, link_latest_model, link_model, stage_best_model, write_promotion_report_json,
    Direction, PromotionOutcome, PromotionReport, SelectionCriterion,
};
use tracing::info;

use super::{settle, Context};

pub fn stage_best(
    ctx: &Context,
    model_name: &str,
    metric_name: &str,
    higher_is_better: bool,
    report_dir: Option<&Path>,
) -> Result<()> {
    const COMMAND: &str = "stage-best-model-to-registry";

    let result = SelectionCriterion::new(metric_name, Direction::from_higher_is_better(higher_is_better))
        .and_then(|criterion| {
            stage_best_model(ctx.store(), &ctx.settings.entity, model_name, &criterion)
                .map(|staged| (criterion, staged))
        });
    let Some((criterion, staged)) = settle(COMMAND, result)? else {
        return Ok(());
    };

    println!("{}", staged.outcome.artifact_name);
    if let Some(dir) = report_dir {
        write_report(
            ctx,
            dir,
            COMMAND,
            Some(criterion),
            Some(staged.value),
            staged.outcome,
        )?;
    }
    Ok(())
}

pub fn link_latest(
    ctx: &Context,
    model_name: &str,
    aliases: &[String],
    report_dir: Option<&Path>,
) -> Result<()> {
    const COMMAND: &str = "link-latest-model";

    let result = link_latest_model(ctx.store(), &ctx.settings.entity, model_name, aliases);
    let Some(outcome) = settle(COMMAND, result)? else {
        return Ok(());
    };

    println!("{}", outcome.artifact_name);
    if let Some(dir) = report_dir {
        write_report(ctx, dir, COMMAND, None, None, outcome)?;
    }
    Ok(())
}

pub fn print_latest(ctx: &Context, model_name: &str) -> Result<()> {
    let result = latest_model_name(ctx.store(), model_name);
    if let Some(name) = settle("print-latest-model", result)? {
        println!("{name}");
    }
    Ok(())
}

pub fn link(
    ctx: &Context,
    artifact_path: &str,
    aliases: &[String],
    report_dir: Option<&Path>,
) -> Result<()> {
    const COMMAND: &str = "link-model";

    let result = link_model(ctx.store(), &ctx.settings.entity, artifact_path, aliases);
    let Some(outcome) = settle(COMMAND, result)? else {
        return Ok(());
    };

    println!("{}", outcome.artifact_name);
    if let Some(dir) = report_dir {
        write_report(ctx, dir, COMMAND, None, None, outcome)?;
    }
    Ok(())
}

fn write_report(
    ctx: &Context,
    dir: &Path,
    command: &str,
    criterion: Option<SelectionCriterion>,
    selected_value: Option<f64>,
    outcome: PromotionOutcome,
) -> Result<()> {
    let report = PromotionReport {
        command: command.to_string(),
        store: ctx.store().name().to_string(),
        criterion,
        selected_value,
        outcome,
        created_at_utc: Utc::now(),
    };
    let path = write_promotion_report_json(dir, &report)
        .with_context(|| format!("write promotion report into {}", dir.display()))?;
    info!(path = %path.display(), config_hash = %ctx.config_hash, "promotion report written");
    Ok(())
}
