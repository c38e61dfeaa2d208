//! GridPilot entry point: run a demo parameter grid in parallel and
//! auto-promote the best performer into the base config.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gp_runner::{config, Orchestrator, OrchestratorConfig, ProcessWorker, WorkerCommand};
use gp_types::ParameterGrid;

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Parser, Debug)]
#[command(name = "gridpilot")]
#[command(about = "Run a demo parameter grid in parallel and auto-promote the best performer")]
#[command(version)]
struct Cli {
    /// Strategy script name handed to the worker via -f
    #[arg(long, default_value = "v2_funding_rate_arb.py")]
    script: String,

    /// Persistent base config; promotion rewrites this file
    #[arg(long, default_value = "conf/scripts/v2_funding_rate_arb.yml")]
    base_config: PathBuf,

    /// YAML grid overriding the built-in default grid
    #[arg(long)]
    grid_config: Option<PathBuf>,

    /// Concurrent workers per cycle (parallelism factor P)
    #[arg(long, default_value_t = 4)]
    parallel: usize,

    /// Observation horizon per cycle, in days
    #[arg(long, default_value_t = 7)]
    run_days: u64,

    /// Liveness poll interval, seconds
    #[arg(long, default_value_t = 30)]
    poll_interval: u64,

    /// Metrics emission interval handed to workers, seconds
    #[arg(long, default_value_t = 60)]
    metrics_interval: u64,

    /// Worker authentication password, forwarded via -p
    #[arg(long)]
    password: Option<String>,

    /// Directory for metrics logs and cycle summaries
    #[arg(long, default_value = "logs/demo_grid")]
    results_dir: PathBuf,

    /// Directory for per-run config artifacts
    #[arg(long, default_value = "conf/scripts/demo_grid")]
    grid_dir: PathBuf,

    /// Root the worker resolves -c paths against; config arguments are
    /// passed relative to it when the grid dir lives underneath
    #[arg(long, default_value = "conf/scripts")]
    config_root: PathBuf,

    /// Number of cycles to run (0 = run forever)
    #[arg(long, default_value_t = 0)]
    cycles: u64,

    /// Seed for the deterministic combination shuffle
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Do not write the best parameters back into the base config
    #[arg(long)]
    no_apply_best: bool,

    /// Worker entry point script
    #[arg(long, default_value = "bin/hummingbot_quickstart.py")]
    worker_entry: PathBuf,

    /// Interpreter used to launch the worker
    #[arg(long, default_value = "python3")]
    python: PathBuf,

    /// Working directory for spawned workers
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Grace period before force-killing workers at horizon end, seconds
    #[arg(long, default_value_t = 20)]
    grace_period: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Fatal startup checks, all before any worker is spawned.
    let entry = if cli.worker_entry.is_absolute() {
        cli.worker_entry.clone()
    } else {
        cli.workdir.join(&cli.worker_entry)
    };
    anyhow::ensure!(
        entry.is_file(),
        "worker entry point not found: {}",
        entry.display()
    );

    let (script_path, script_name) = resolve_script(&cli.workdir, &cli.script);
    anyhow::ensure!(
        script_path.is_file(),
        "strategy script not found: {}",
        script_path.display()
    );

    let base = config::load_base_config(&cli.base_config).context("loading base config")?;
    config::validate_base_config(&base, cli.parallel).context("validating base config")?;

    let grid = match &cli.grid_config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading grid config {}", path.display()))?;
            ParameterGrid::from_yaml_str(&text).context("parsing grid config")?
        }
        None => ParameterGrid::default_demo_grid(),
    };

    let worker = ProcessWorker::new(WorkerCommand {
        python: cli.python.clone(),
        entry_point: cli.worker_entry.clone(),
        script: script_name.clone(),
        password: cli.password.clone(),
        workdir: cli.workdir.clone(),
    });

    let orchestrator_config = OrchestratorConfig {
        base_config_path: cli.base_config.clone(),
        grid,
        parallel: cli.parallel,
        horizon: Duration::from_secs(cli.run_days * SECONDS_PER_DAY),
        poll_interval: Duration::from_secs(cli.poll_interval),
        grace_period: Duration::from_secs(cli.grace_period),
        metrics_interval_secs: cli.metrics_interval,
        results_dir: cli.results_dir.clone(),
        grid_dir: cli.grid_dir.clone(),
        config_arg_root: Some(cli.config_root.clone()),
        cycles: cli.cycles,
        seed: cli.seed,
        apply_best: !cli.no_apply_best,
    };

    info!(
        script = %script_name,
        parallel = cli.parallel,
        run_days = cli.run_days,
        cycles = cli.cycles,
        seed = cli.seed,
        "starting grid search"
    );

    let mut orchestrator = Orchestrator::new(orchestrator_config, worker)?;
    orchestrator.run().await?;
    Ok(())
}

/// Resolve the strategy script the worker will be handed via `-f`.
///
/// A value with a path separator is taken as a path under `workdir` and the
/// worker still only sees its basename; a bare name is looked up under
/// `workdir/scripts/`.
fn resolve_script(workdir: &Path, script: &str) -> (PathBuf, String) {
    if script.contains(std::path::MAIN_SEPARATOR) || script.contains('/') {
        let path = workdir.join(script);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.to_string());
        (path, name)
    } else {
        (workdir.join("scripts").join(script), script.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_script_name_resolves_under_scripts_dir() {
        let (path, name) = resolve_script(Path::new("/repo"), "v2_funding_rate_arb.py");
        assert_eq!(path, Path::new("/repo/scripts/v2_funding_rate_arb.py"));
        assert_eq!(name, "v2_funding_rate_arb.py");
    }

    #[test]
    fn script_path_resolves_from_workdir_and_keeps_basename() {
        let (path, name) = resolve_script(Path::new("/repo"), "custom/dir/strategy.py");
        assert_eq!(path, Path::new("/repo/custom/dir/strategy.py"));
        assert_eq!(name, "strategy.py");
    }
}
