use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use combat_core::{run_combat, MatchReport, ScenarioConfig, SimulationSettings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(version, about = "Run tactics combat scenarios headlessly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario to completion and emit a JSON match report.
    Simulate(SimulateArgs),
    /// Parse and validate a scenario without running it.
    Validate(ValidateArgs),
    /// List every scenario file under a directory.
    List(ListArgs),
    /// Pretty-print an existing report.
    Report(ReportArgs),
}

#[derive(Args)]
struct SimulateArgs {
    #[arg(long)]
    scenario: PathBuf,
    /// Fixed tick length in seconds.
    #[arg(long, default_value_t = combat_core::simulation::DEFAULT_TICK_SECONDS)]
    dt: f32,
    #[arg(long, default_value_t = combat_core::simulation::DEFAULT_TIME_LIMIT)]
    max_seconds: f32,
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(long)]
    scenario: PathBuf,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, default_value = "scenarios")]
    dir: PathBuf,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    input: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();
    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate(args) => handle_simulate(args),
        Commands::Validate(args) => handle_validate(args),
        Commands::List(args) => handle_list(args),
        Commands::Report(args) => handle_report(args),
    }
}

fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    let scenario = ScenarioConfig::from_path(path)
        .with_context(|| format!("failed to load scenario {}", path.display()))?;
    scenario
        .validate()
        .with_context(|| format!("scenario {} is invalid", path.display()))?;
    Ok(scenario)
}

fn handle_simulate(args: SimulateArgs) -> Result<()> {
    let settings = SimulationSettings {
        tick_seconds: args.dt,
        time_limit: args.max_seconds,
    };
    settings
        .validate()
        .context("invalid --dt or --max-seconds")?;
    let scenario = load_scenario(&args.scenario)?;
    let mut roster = scenario.build_roster()?;

    let run_id = args
        .id
        .unwrap_or_else(|| format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S")));
    let run = run_combat(&mut roster, settings);
    if run.timed_out {
        warn!(scenario = %args.scenario.display(), "time limit reached before a winner emerged");
    }
    let scenario_name = scenario
        .name
        .clone()
        .or_else(|| Some(args.scenario.display().to_string()));
    let report = MatchReport::new(run_id, scenario_name, &roster, &run);
    let rendered = serde_json::to_string_pretty(&report)?;
    println!("{rendered}");

    if let Some(out) = args.out.as_ref() {
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(out, &rendered)
            .with_context(|| format!("failed to write report to {}", out.display()))?;
        println!("Report written to {}", out.display());
    }
    Ok(())
}

fn handle_validate(args: ValidateArgs) -> Result<()> {
    let scenario = load_scenario(&args.scenario)?;
    let placed = scenario.units.iter().filter(|u| u.placed).count();
    println!(
        "{} ok: {} units ({} placed), mitigation {:?}",
        args.scenario.display(),
        scenario.units.len(),
        placed,
        scenario.rules.mitigation
    );
    Ok(())
}

fn handle_list(args: ListArgs) -> Result<()> {
    let mut found = Vec::new();
    for entry in WalkDir::new(&args.dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to scan {}", args.dir.display()))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            found.push(path.to_path_buf());
        }
    }
    if found.is_empty() {
        info!(dir = %args.dir.display(), "no scenarios found");
    }
    for path in found {
        match load_scenario(&path) {
            Ok(scenario) => println!(
                "{}\t{}\t{} units",
                path.display(),
                scenario.name.as_deref().unwrap_or("-"),
                scenario.units.len()
            ),
            Err(err) => println!("{}\tinvalid: {err:#}", path.display()),
        }
    }
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<()> {
    let data = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let report: MatchReport = serde_json::from_str(&data)?;
    println!(
        "Report {} -> {:?} after {:.2}s ({} deaths, {} survivors)",
        report.id,
        report.summary.outcome,
        report.summary.elapsed_seconds,
        report.deaths.len(),
        report.survivors.len()
    );
    for death in &report.deaths {
        let killer = death
            .killer
            .map(|k| k.to_string())
            .unwrap_or_else(|| "unknown".into());
        println!("  {} {} fell at {:.2}s to {}", death.unit, death.name, death.at_seconds, killer);
    }
    Ok(())
}
