use anyhow::Result;
use clap::{Parser, Subcommand};
use mreg_config::{SettingsOverrides, ENV_LOG_LEVEL};
use mreg_promotion::{DEFAULT_LINK_ALIAS, DEFAULT_METRIC};
use std::io::IsTerminal;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "mreg")]
#[command(about = "Model registry promotion CLI", long_about = None)]
struct Cli {
    /// Layered config YAML paths in merge order (base -> env -> local)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// Registry entity (overrides WANDB_ENTITY)
    #[arg(long, global = true)]
    entity: Option<String>,

    /// Registry project (overrides WANDB_PROJECT)
    #[arg(long, global = true)]
    project: Option<String>,

    /// Directory of a local registry (overrides MREG_STORE_ROOT)
    #[arg(long, global = true, conflicts_with = "store_url")]
    store_root: Option<PathBuf>,

    /// Base url of a remote registry service (overrides MREG_STORE_URL)
    #[arg(long, global = true)]
    store_url: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link the version with the best metric into the registry as best + staging
    StageBestModelToRegistry {
        model_name: String,

        /// Metadata key to rank versions by
        #[arg(long = "metric-name", alias = "metric_name", default_value = DEFAULT_METRIC)]
        metric_name: String,

        /// true: larger values win; false: smaller values win
        #[arg(
            long = "higher-is-better",
            alias = "higher_is_better",
            default_value_t = true,
            action = clap::ArgAction::Set
        )]
        higher_is_better: bool,

        /// Write promotion_report.json into this directory
        #[arg(long = "report-dir")]
        report_dir: Option<PathBuf>,
    },

    /// Link the version tagged latest into the registry
    LinkLatestModel {
        model_name: String,

        /// Registry aliases (repeatable)
        #[arg(short = 'a', long = "aliases", default_value = DEFAULT_LINK_ALIAS)]
        aliases: Vec<String>,

        #[arg(long = "report-dir")]
        report_dir: Option<PathBuf>,
    },

    /// Print the name of the version tagged latest (no mutation)
    PrintLatestModel { model_name: String },

    /// Link an artifact given as entity/project/name:version into the registry
    LinkModel {
        artifact_path: String,

        /// Registry aliases (repeatable)
        #[arg(short = 'a', long = "aliases", default_value = DEFAULT_LINK_ALIAS)]
        aliases: Vec<String>,

        #[arg(long = "report-dir")]
        report_dir: Option<PathBuf>,
    },

    /// Publish a new version of a model into a local registry
    LogModel {
        model_name: String,

        /// Metric as key=value (repeatable)
        #[arg(short = 'm', long = "metric")]
        metrics: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    let overrides = SettingsOverrides {
        entity: cli.entity,
        project: cli.project,
        store_root: cli.store_root,
        store_url: cli.store_url,
    };
    let ctx = commands::Context::load(&cli.config_paths, &overrides)?;

    match cli.cmd {
        Commands::StageBestModelToRegistry {
            model_name,
            metric_name,
            higher_is_better,
            report_dir,
        } => commands::registry::stage_best(
            &ctx,
            &model_name,
            &metric_name,
            higher_is_better,
            report_dir.as_deref(),
        ),
        Commands::LinkLatestModel {
            model_name,
            aliases,
            report_dir,
        } => commands::registry::link_latest(&ctx, &model_name, &aliases, report_dir.as_deref()),
        Commands::PrintLatestModel { model_name } => {
            commands::registry::print_latest(&ctx, &model_name)
        }
        Commands::LinkModel {
            artifact_path,
            aliases,
            report_dir,
        } => commands::registry::link(&ctx, &artifact_path, &aliases, report_dir.as_deref()),
        Commands::LogModel {
            model_name,
            metrics,
        } => commands::log_model::run(&ctx, &model_name, &metrics),
    }
}

/// RUST_LOG wins; LOG_LEVEL is the operator-facing shorthand. Logs go to
/// stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::EnvFilter::try_new(level)
        })
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}
