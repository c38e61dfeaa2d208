//! Run lifecycle records and per-cycle results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::grid::ParameterCombination;
use crate::metrics::RunMetrics;

/// Timestamp format shared by run ids and cycle artifacts.
pub const CYCLE_TS_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Unique run identifier: cycle timestamp plus 1-based ordinal within the
/// cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(cycle_ts: &str, ordinal: usize) -> Self {
        Self(format!("{cycle_ts}_{ordinal}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a supervised run.
///
/// `Exited -> Running` (restart) is permitted only while the cycle's
/// observation horizon has not elapsed; every run ends `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Exited,
    Terminated,
}

/// A single supervised run within a cycle: one parameter combination, one
/// config artifact, one metrics log, one (restartable) worker process.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: RunId,
    pub parameters: ParameterCombination,
    /// Absolute path of the materialized config artifact.
    pub config_path: PathBuf,
    /// The config argument handed to the worker, possibly relative to the
    /// worker's config root.
    pub config_arg: String,
    /// Path the worker appends metrics rows to.
    pub metrics_path: PathBuf,
    pub status: RunStatus,
    /// Number of in-horizon relaunches after early exits.
    pub restarts: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Exit code observed on the most recent exit, if any.
    pub last_exit_code: Option<i32>,
}

impl RunRecord {
    pub fn new(
        id: RunId,
        parameters: ParameterCombination,
        config_path: PathBuf,
        config_arg: String,
        metrics_path: PathBuf,
    ) -> Self {
        Self {
            id,
            parameters,
            config_path,
            config_arg,
            metrics_path,
            status: RunStatus::Pending,
            restarts: 0,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            last_exit_code: None,
        }
    }

    /// Transition into `Running`. A transition out of `Exited` counts as a
    /// restart.
    pub fn mark_running(&mut self) {
        if self.status == RunStatus::Exited {
            self.restarts += 1;
        }
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.status = RunStatus::Running;
    }

    pub fn mark_exited(&mut self, code: Option<i32>) {
        self.status = RunStatus::Exited;
        self.last_exit_code = code;
    }

    pub fn mark_terminated(&mut self) {
        self.status = RunStatus::Terminated;
        self.finished_at = Some(Utc::now());
    }

    /// Reduce this record to the report shape persisted in the cycle summary.
    pub fn to_report(&self, metrics: Option<RunMetrics>) -> RunReport {
        RunReport {
            run_id: self.id.clone(),
            params: self.parameters.clone(),
            metrics,
            metrics_file: self.metrics_path.to_string_lossy().into_owned(),
            restarts: self.restarts,
        }
    }
}

/// One run's entry in the cycle summary artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub params: ParameterCombination,
    pub metrics: Option<RunMetrics>,
    pub metrics_file: String,
    pub restarts: u32,
}

/// The outcome of one full cycle: every run's report plus the selected best
/// (absent when no run produced valid metrics).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleResult {
    pub cycle_ts: String,
    pub runs: Vec<RunReport>,
    pub best: Option<RunReport>,
}
