//! Horizon-bounded supervision of the cycle's worker processes.

use tokio::time::{sleep, Duration, Instant};
use tracing::{error, info, warn};

use gp_types::{GpResult, RunRecord, RunStatus};

use crate::worker::{Worker, WorkerState};

/// Timing knobs for one cycle of supervision.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Wall-clock duration the cycle's runs are allowed to execute.
    pub horizon: Duration,
    /// Fixed liveness-poll cadence, independent of the metrics-emission
    /// interval.
    pub poll_interval: Duration,
    /// How long a worker gets between the graceful stop and the force-kill.
    pub grace_period: Duration,
}

/// Launches one worker per run, polls liveness on a fixed interval, restarts
/// early exits, and terminates everything at horizon end.
///
/// Restarts reuse the identical config artifact and are unlimited within the
/// horizon; this is crash recovery, not retry-with-backoff.
pub struct ProcessSupervisor<W: Worker> {
    worker: W,
    config: SupervisorConfig,
}

impl<W: Worker> ProcessSupervisor<W> {
    pub fn new(worker: W, config: SupervisorConfig) -> Self {
        Self { worker, config }
    }

    /// Drive all runs of one cycle from launch to termination. All runs are
    /// launched before any is polled; on return every run is `Terminated`.
    pub async fn supervise(&self, runs: &mut [RunRecord]) -> GpResult<()> {
        let mut handles = Vec::with_capacity(runs.len());
        for idx in 0..runs.len() {
            match self.worker.start(&runs[idx]).await {
                Ok(handle) => {
                    runs[idx].mark_running();
                    info!(run_id = %runs[idx].id, "worker launched");
                    handles.push(handle);
                }
                Err(e) => {
                    // Don't orphan the workers launched so far.
                    error!(
                        run_id = %runs[idx].id,
                        error = %e,
                        "launch failed, stopping already-started workers"
                    );
                    let launched = handles.len();
                    self.stop_all(&mut runs[..launched], &mut handles).await;
                    return Err(e);
                }
            }
        }

        let deadline = Instant::now() + self.config.horizon;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
            if Instant::now() >= deadline {
                // Exits discovered at or after the horizon get no restart.
                break;
            }
            self.poll_once(runs, &mut handles).await;
        }

        self.stop_all(runs, &mut handles).await;
        Ok(())
    }

    async fn poll_once(&self, runs: &mut [RunRecord], handles: &mut [W::Handle]) {
        for (run, handle) in runs.iter_mut().zip(handles.iter_mut()) {
            if run.status != RunStatus::Running {
                continue;
            }
            if let WorkerState::Exited(code) = self.worker.poll(handle).await {
                run.mark_exited(code);
                warn!(run_id = %run.id, code = ?code, "worker exited early, restarting");
                match self.worker.start(run).await {
                    Ok(replacement) => {
                        *handle = replacement;
                        run.mark_running();
                    }
                    Err(e) => {
                        // Recorded as metrics-absent in the cycle summary
                        // rather than aborting the cycle.
                        warn!(run_id = %run.id, error = %e, "relaunch failed, leaving run down");
                    }
                }
            }
        }
    }

    /// Graceful-then-forced termination of every run; always transitions to
    /// `Terminated`.
    async fn stop_all(&self, runs: &mut [RunRecord], handles: &mut [W::Handle]) {
        for (run, handle) in runs.iter_mut().zip(handles.iter_mut()) {
            self.worker
                .terminate(handle, self.config.grace_period)
                .await;
            run.mark_terminated();
            info!(run_id = %run.id, restarts = run.restarts, "worker terminated");
        }
    }
}
