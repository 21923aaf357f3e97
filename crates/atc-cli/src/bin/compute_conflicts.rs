//! Compute pairwise conflict tables for a traffic scenario.
//!
//! Reads a scenario JSON file (or a built-in demo), evaluates every aircraft
//! pair and writes the report as JSON to a file or stdout.

use anyhow::{bail, Context, Result};
use atc_cli::{demos, ReportFile, ScenarioFile};
use atc_conflicts::{compute_conflicts, ConflictParams};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Compute conflict tables for every aircraft pair of a scenario
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scenario JSON file
    #[arg(long, required_unless_present = "demo", conflicts_with = "demo")]
    scenario: Option<PathBuf>,

    /// Built-in scenario: crossing, trailing or head-on
    #[arg(long)]
    demo: Option<String>,

    /// Parameter JSON file; missing fields keep their defaults
    #[arg(long)]
    params: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Look-ahead horizon in seconds
    #[arg(long)]
    tmax: Option<f64>,

    /// Worker threads (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Leave the per-timestamp rows out of the report
    #[arg(long)]
    summary_only: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;

    let file = match (&args.scenario, &args.demo) {
        (Some(path), _) => ScenarioFile::load(path)?,
        (None, Some(name)) => match demos::by_name(name) {
            Some(file) => file,
            None => bail!("unknown demo {name:?}, expected one of {:?}", demos::NAMES),
        },
        (None, None) => bail!("either --scenario or --demo is required"),
    };

    let params = resolve_params(&args, &file)?;
    let loaded = file.build(&params)?;

    tracing::info!(
        scenario = %loaded.name,
        aircraft = loaded.scenario.flightpaths().len(),
        tmax_s = params.tmax_s,
        "scenario ready"
    );

    let report = compute_conflicts(&loaded.scenario, &loaded.trajectories, &params);
    let rendered =
        ReportFile::new(&loaded.name, &report, loaded.skipped.clone(), !args.summary_only)
            .to_json()?;

    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("failed to write report {}", path.display()))?;
            tracing::info!(path = %path.display(), tables = report.len(), "report written");
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

/// Scenario defaults, then the params file, then command-line overrides.
fn resolve_params(args: &Args, file: &ScenarioFile) -> Result<ConflictParams> {
    let mut params = match &args.params {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read params {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse params {}", path.display()))?
        }
        None => file.params.clone().unwrap_or_default(),
    };
    if let Some(tmax) = args.tmax {
        params.tmax_s = tmax;
    }
    if args.threads.is_some() {
        params.worker_threads = args.threads;
    }
    Ok(params)
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("atc_conflicts=info".parse()?)
        .add_directive("compute_conflicts=info".parse()?);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
