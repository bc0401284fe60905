mod config;
mod handlers;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wbs_rollup::engine::duration::DurationUnit;

use config::Config;

#[derive(Parser)]
#[command(name = "wbs-rollup", version, about = "Roll WBS status, dates and effort up from tasks")]
struct Cli {
    /// Config file (default: ./wbs-rollup.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log engine progress to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Roll a workbook (phases, sub-phases, tasks) up from its tasks
    Workbook {
        /// JSON array of workbook records
        #[arg(long)]
        records: PathBuf,
        /// JSON array of status vocabulary entries
        #[arg(long)]
        statuses: PathBuf,
        /// JSON array holding "Project Settings" and "Project Calendar" entries
        #[arg(long)]
        project_info: Option<PathBuf>,
        /// Nominal task depth, not counting phase and sub-phase
        #[arg(long)]
        max_level: Option<usize>,
        #[arg(long)]
        json: bool,
        /// Write the updated records here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Roll an analytics tree up through explicit parent links
    Analytics {
        #[arg(long)]
        records: PathBuf,
        #[arg(long)]
        statuses: PathBuf,
        /// Deepest level; defaults to the deepest `$wbs` path
        #[arg(long)]
        max_level: Option<usize>,
        #[arg(long)]
        json: bool,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Working duration between two dates
    Duration {
        from: String,
        to: String,
        #[arg(long, default_value = "days")]
        unit: DurationUnit,
        /// Non-working weekday, e.g. Saturday (repeatable)
        #[arg(long = "week-off")]
        week_offs: Vec<String>,
        /// Holiday date (repeatable)
        #[arg(long = "holiday")]
        holidays: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Workbook {
            records,
            statuses,
            project_info,
            max_level,
            json,
            output,
        } => handlers::workbook::handle(
            &records,
            &statuses,
            project_info.as_deref(),
            max_level,
            json,
            output.as_deref(),
            &config,
        ),
        Commands::Analytics {
            records,
            statuses,
            max_level,
            json,
            output,
        } => handlers::analytics::handle(
            &records,
            &statuses,
            max_level,
            json,
            output.as_deref(),
            &config,
        ),
        Commands::Duration {
            from,
            to,
            unit,
            week_offs,
            holidays,
        } => handlers::duration::handle(&from, &to, unit, &week_offs, &holidays),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
