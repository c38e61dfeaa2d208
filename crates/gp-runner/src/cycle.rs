//! The orchestrator control loop.
//!
//! One single thread of control drives sequential cycles. Per cycle: read the
//! base config, select combinations, materialize one config artifact per run,
//! supervise all workers to the horizon, collect metrics, persist the cycle
//! summary, and promote the best parameters. The promoted config is picked up
//! by the next cycle's base-config read.

use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use gp_search::ComboSelector;
use gp_types::{
    CycleResult, GpResult, ParameterGrid, RunId, RunRecord, RunReport, CYCLE_TS_FORMAT,
};

use crate::collector;
use crate::config;
use crate::promote::PromotionEngine;
use crate::selection;
use crate::supervisor::{ProcessSupervisor, SupervisorConfig};
use crate::worker::Worker;

/// Everything the control loop needs, passed explicitly; no component reads
/// ambient global state.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub base_config_path: PathBuf,
    pub grid: ParameterGrid,
    /// Parallelism factor P: workers per cycle.
    pub parallel: usize,
    /// Observation horizon per cycle.
    pub horizon: Duration,
    /// Liveness-poll cadence.
    pub poll_interval: Duration,
    /// Grace window between graceful stop and force-kill.
    pub grace_period: Duration,
    /// Metrics emission interval handed to each worker, seconds.
    pub metrics_interval_secs: u64,
    /// Where metrics logs and cycle summaries land.
    pub results_dir: PathBuf,
    /// Where per-run config artifacts land.
    pub grid_dir: PathBuf,
    /// Root the worker resolves `-c` paths against. When the grid dir lives
    /// under it, workers get a relative config argument; otherwise the
    /// absolute artifact path is passed.
    pub config_arg_root: Option<PathBuf>,
    /// Number of cycles to run; 0 means run forever.
    pub cycles: u64,
    /// Seed for the deterministic combination shuffle.
    pub seed: u64,
    /// Whether the best parameters are written back into the base config.
    pub apply_best: bool,
}

/// The cycle driver: select → run → score → promote, optionally forever.
pub struct Orchestrator<W: Worker> {
    config: OrchestratorConfig,
    selector: ComboSelector,
    supervisor: ProcessSupervisor<W>,
    promoter: PromotionEngine,
}

impl<W: Worker> Orchestrator<W> {
    /// Expands the grid and prepares the run directories. Fails on an empty
    /// grid before anything is spawned.
    pub fn new(config: OrchestratorConfig, worker: W) -> GpResult<Self> {
        let selector = ComboSelector::new(&config.grid, config.seed)?;
        std::fs::create_dir_all(&config.results_dir)?;
        std::fs::create_dir_all(&config.grid_dir)?;

        let supervisor = ProcessSupervisor::new(
            worker,
            SupervisorConfig {
                horizon: config.horizon,
                poll_interval: config.poll_interval,
                grace_period: config.grace_period,
            },
        );
        let promoter = PromotionEngine::new(config.base_config_path.clone(), config.apply_best);

        Ok(Self {
            config,
            selector,
            supervisor,
            promoter,
        })
    }

    /// Drive cycles until the configured count is reached (or forever when
    /// the count is 0).
    pub async fn run(&mut self) -> GpResult<()> {
        let mut cycle = 0u64;
        loop {
            cycle += 1;
            if self.config.cycles != 0 && cycle > self.config.cycles {
                return Ok(());
            }
            let result = self.run_cycle(cycle).await?;
            info!(
                cycle,
                runs = result.runs.len(),
                best = result.best.as_ref().map(|b| b.run_id.as_str()),
                "cycle complete"
            );
        }
    }

    /// One full cycle. Ordering: all runs launched before any are polled, all
    /// terminated before metrics are collected, selection before promotion.
    pub async fn run_cycle(&mut self, cycle: u64) -> GpResult<CycleResult> {
        let base = config::load_base_config(&self.config.base_config_path)?;
        let cycle_ts = Utc::now().format(CYCLE_TS_FORMAT).to_string();
        let selected = self.selector.select(self.config.parallel);
        info!(cycle, ts = %cycle_ts, runs = selected.len(), "starting cycle");

        let mut runs = Vec::with_capacity(selected.len());
        for (idx, params) in selected.into_iter().enumerate() {
            let run_id = RunId::new(&cycle_ts, idx + 1);
            let metrics_path = self.config.results_dir.join(format!("{run_id}.csv"));
            let artifact = config::materialize_run_config(
                &base,
                &params,
                &run_id,
                &metrics_path,
                self.config.metrics_interval_secs,
            );

            let artifact_name = format!("demo_grid_{run_id}.yml");
            let config_path = self.config.grid_dir.join(&artifact_name);
            config::write_yaml_atomic(&config_path, &artifact)?;
            let config_arg = self.config_arg(&config_path, &artifact_name);

            runs.push(RunRecord::new(
                run_id,
                params,
                config_path,
                config_arg,
                metrics_path,
            ));
        }

        self.supervisor.supervise(&mut runs).await?;

        let reports: Vec<RunReport> = runs
            .iter()
            .map(|run| run.to_report(collector::read_latest_metrics(&run.metrics_path)))
            .collect();
        let best = selection::select_best(&reports).cloned();
        let result = CycleResult {
            cycle_ts: cycle_ts.clone(),
            runs: reports,
            best,
        };

        let summary_path = self
            .config
            .results_dir
            .join(format!("weekly_results_{cycle_ts}.json"));
        std::fs::write(&summary_path, serde_json::to_string_pretty(&result)?)?;
        info!(path = %summary_path.display(), "cycle summary written");

        if let Some(best) = &result.best {
            self.promoter.promote(&base, &best.params)?;
        }

        Ok(result)
    }

    fn config_arg(&self, config_path: &std::path::Path, artifact_name: &str) -> String {
        match &self.config.config_arg_root {
            Some(root) => match self.config.grid_dir.strip_prefix(root) {
                Ok(rel) => rel.join(artifact_name).to_string_lossy().into_owned(),
                Err(_) => config_path.to_string_lossy().into_owned(),
            },
            None => config_path.to_string_lossy().into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{Worker, WorkerState};
    use async_trait::async_trait;
    use serde_yaml::Value;
    use std::fs;
    use std::path::Path;

    /// Fake worker that "runs the strategy" instantly: on start it writes a
    /// metrics log whose pnl equals the run's `a` parameter.
    struct ScoringWorker;

    #[async_trait]
    impl Worker for ScoringWorker {
        type Handle = ();

        async fn start(&self, run: &RunRecord) -> GpResult<()> {
            let pnl = run
                .parameters
                .get("a")
                .and_then(Value::as_f64)
                .unwrap_or_default();
            let drawdown = run
                .parameters
                .get("b")
                .and_then(Value::as_f64)
                .unwrap_or_default();
            fs::write(
                &run.metrics_path,
                format!(
                    "total_pnl,max_drawdown_pct,max_drawdown,equity\n\
                     {pnl},{drawdown},{drawdown},100\n"
                ),
            )?;
            Ok(())
        }

        async fn poll(&self, _handle: &mut ()) -> WorkerState {
            WorkerState::Running
        }

        async fn terminate(&self, _handle: &mut (), _grace: std::time::Duration) {}
    }

    /// Worker that never produces a metrics file.
    struct SilentWorker;

    #[async_trait]
    impl Worker for SilentWorker {
        type Handle = ();

        async fn start(&self, _run: &RunRecord) -> GpResult<()> {
            Ok(())
        }

        async fn poll(&self, _handle: &mut ()) -> WorkerState {
            WorkerState::Running
        }

        async fn terminate(&self, _handle: &mut (), _grace: std::time::Duration) {}
    }

    fn write_base(dir: &Path) -> PathBuf {
        let path = dir.join("base.yml");
        fs::write(
            &path,
            "connectors: [binance_perpetual, okx_perpetual]\ntokens: [BTC]\nleverage: 3\n",
        )
        .unwrap();
        path
    }

    fn orchestrator_config(dir: &Path, grid: ParameterGrid) -> OrchestratorConfig {
        OrchestratorConfig {
            base_config_path: write_base(dir),
            grid,
            parallel: 4,
            horizon: Duration::from_millis(200),
            poll_interval: Duration::from_millis(50),
            grace_period: Duration::from_millis(50),
            metrics_interval_secs: 60,
            results_dir: dir.join("results"),
            grid_dir: dir.join("grid"),
            config_arg_root: None,
            cycles: 1,
            seed: 7,
            apply_best: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycle_covers_grid_and_promotes_best() {
        let dir = tempfile::tempdir().unwrap();
        let grid = ParameterGrid::from_yaml_str("a: [1, 2]\nb: [10, 20]\n").unwrap();
        let cfg = orchestrator_config(dir.path(), grid);
        let base_path = cfg.base_config_path.clone();

        let mut orchestrator = Orchestrator::new(cfg, ScoringWorker).unwrap();
        let result = orchestrator.run_cycle(1).await.unwrap();

        // P=4 over a 2x2 grid: every combination exactly once.
        assert_eq!(result.runs.len(), 4);
        let mut identities: Vec<String> =
            result.runs.iter().map(|r| r.params.identity()).collect();
        identities.sort();
        identities.dedup();
        assert_eq!(identities.len(), 4);

        // Best run is the one with the highest pnl (a=2) and the lower
        // drawdown tie-break (b=10).
        let best = result.best.as_ref().unwrap();
        assert_eq!(best.params.get("a"), Some(&Value::from(2)));
        assert_eq!(best.params.get("b"), Some(&Value::from(10)));

        // Promotion wrote the winner's parameters into the base config.
        let promoted = config::load_base_config(&base_path).unwrap();
        assert_eq!(promoted.get("a"), Some(&Value::from(2)));
        assert_eq!(promoted.get("b"), Some(&Value::from(10)));
        assert_eq!(promoted.get("leverage"), Some(&Value::from(3)));

        // Summary artifact exists and round-trips.
        let summary_path = dir
            .path()
            .join("results")
            .join(format!("weekly_results_{}.json", result.cycle_ts));
        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary_path).unwrap()).unwrap();
        assert_eq!(summary["runs"].as_array().unwrap().len(), 4);
        assert!(!summary["best"].is_null());
    }

    #[tokio::test(start_paused = true)]
    async fn metrics_free_cycle_skips_promotion() {
        let dir = tempfile::tempdir().unwrap();
        let grid = ParameterGrid::from_yaml_str("a: [1, 2]\n").unwrap();
        let mut cfg = orchestrator_config(dir.path(), grid);
        cfg.parallel = 2;
        let base_path = cfg.base_config_path.clone();
        let before = config::load_base_config(&base_path).unwrap();

        let mut orchestrator = Orchestrator::new(cfg, SilentWorker).unwrap();
        let result = orchestrator.run_cycle(1).await.unwrap();

        assert_eq!(result.runs.len(), 2);
        assert!(result.runs.iter().all(|r| r.metrics.is_none()));
        assert!(result.best.is_none());
        // Base config carries forward unchanged.
        assert_eq!(config::load_base_config(&base_path).unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn run_respects_cycle_count() {
        let dir = tempfile::tempdir().unwrap();
        let grid = ParameterGrid::from_yaml_str("a: [1, 2, 3]\nb: [1, 2, 3]\n").unwrap();
        let mut cfg = orchestrator_config(dir.path(), grid);
        cfg.parallel = 2;
        cfg.cycles = 3;

        let mut orchestrator = Orchestrator::new(cfg, ScoringWorker).unwrap();
        orchestrator.run().await.unwrap();

        let summaries: Vec<_> = fs::read_dir(dir.path().join("results"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("weekly_results_")
            })
            .collect();
        // Three cycles inside one paused-clock second share a timestamp only
        // if they run in the same wall second; each summary overwrite still
        // leaves at least one artifact.
        assert!(!summaries.is_empty() && summaries.len() <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn relative_config_arg_when_grid_dir_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let grid = ParameterGrid::from_yaml_str("a: [1]\n").unwrap();
        let mut cfg = orchestrator_config(dir.path(), grid);
        cfg.parallel = 1;
        cfg.grid_dir = dir.path().join("conf/scripts/demo_grid");
        cfg.config_arg_root = Some(dir.path().join("conf/scripts"));

        let orchestrator = Orchestrator::new(cfg, ScoringWorker).unwrap();
        let arg = orchestrator.config_arg(
            &dir.path().join("conf/scripts/demo_grid/demo_grid_x.yml"),
            "demo_grid_x.yml",
        );
        assert_eq!(arg, "demo_grid/demo_grid_x.yml");
    }
}
