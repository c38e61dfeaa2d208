//! Worker process abstraction.
//!
//! The orchestrator treats each worker as a black box behind the [`Worker`]
//! trait: start it with a run's config artifact, poll its liveness, and
//! terminate it at horizon end. [`ProcessWorker`] is the real implementation
//! backed by `tokio::process`; supervisor tests plug in fakes.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use gp_types::{GpError, GpResult, RunRecord};

/// Liveness of a worker process as seen by a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    /// The process has exited; the code is absent when it was killed by a
    /// signal or could not be queried.
    Exited(Option<i32>),
}

/// External collaborator interface for one worker process.
///
/// Implementations should attempt a graceful stop first and force-kill once
/// the grace period elapses.
#[async_trait]
pub trait Worker: Send + Sync {
    type Handle: Send;

    /// Launch a worker for `run`, reading the run's materialized config.
    async fn start(&self, run: &RunRecord) -> GpResult<Self::Handle>;

    /// Non-blocking liveness check.
    async fn poll(&self, handle: &mut Self::Handle) -> WorkerState;

    /// Graceful-then-forced termination, bounded by `grace`.
    async fn terminate(&self, handle: &mut Self::Handle, grace: Duration);
}

/// How to invoke the real worker entry point.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    /// Interpreter used to launch the entry point.
    pub python: PathBuf,
    /// Worker entry point script.
    pub entry_point: PathBuf,
    /// Strategy script name, passed via `-f`.
    pub script: String,
    /// Optional authentication password, passed via `-p`.
    pub password: Option<String>,
    /// Working directory for the spawned process.
    pub workdir: PathBuf,
}

/// Spawns and controls real worker OS processes.
pub struct ProcessWorker {
    command: WorkerCommand,
}

impl ProcessWorker {
    pub fn new(command: WorkerCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Worker for ProcessWorker {
    type Handle = Child;

    async fn start(&self, run: &RunRecord) -> GpResult<Child> {
        let mut cmd = Command::new(&self.command.python);
        cmd.arg(&self.command.entry_point)
            .arg("-f")
            .arg(&self.command.script)
            .arg("-c")
            .arg(&run.config_arg)
            .current_dir(&self.command.workdir)
            .kill_on_drop(true);
        if let Some(password) = &self.command.password {
            cmd.arg("-p").arg(password);
        }

        let child = cmd.spawn().map_err(|e| {
            GpError::Worker(format!(
                "failed to spawn worker for run {}: {e}",
                run.id
            ))
        })?;
        debug!(run_id = %run.id, pid = ?child.id(), "worker process spawned");
        Ok(child)
    }

    async fn poll(&self, child: &mut Child) -> WorkerState {
        match child.try_wait() {
            Ok(Some(status)) => WorkerState::Exited(status.code()),
            Ok(None) => WorkerState::Running,
            Err(e) => {
                warn!(error = %e, "could not poll worker, treating as exited");
                WorkerState::Exited(None)
            }
        }
    }

    async fn terminate(&self, child: &mut Child, grace: Duration) {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }

        // Ask nicely first. tokio's Child only exposes SIGKILL, so the
        // graceful path goes through kill(1) on unix.
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                let _ = Command::new("kill").arg(pid.to_string()).status().await;
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }

        if tokio::time::timeout(grace, child.wait()).await.is_err() {
            warn!(pid = ?child.id(), "worker ignored termination, force-killing");
            let _ = child.kill().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_worker() -> ProcessWorker {
        ProcessWorker::new(WorkerCommand {
            python: PathBuf::from("python3"),
            entry_point: PathBuf::from("bin/worker.py"),
            script: "demo.py".into(),
            password: None,
            workdir: PathBuf::from("."),
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_force_kills_when_grace_is_exceeded() {
        let worker = process_worker();
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("trap '' TERM; sleep 300")
            .spawn()
            .unwrap();
        // let the shell install its trap before asking it to stop
        tokio::time::sleep(Duration::from_millis(200)).await;

        worker
            .terminate(&mut child, Duration::from_millis(300))
            .await;

        assert!(
            child.try_wait().unwrap().is_some(),
            "process survived terminate"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_lets_a_cooperative_process_exit_within_grace() {
        let worker = process_worker();
        let mut child = Command::new("sleep").arg("300").spawn().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        worker.terminate(&mut child, Duration::from_secs(5)).await;

        assert!(child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_is_a_noop_for_an_already_exited_process() {
        let worker = process_worker();
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().await.unwrap();

        worker.terminate(&mut child, Duration::from_secs(5)).await;

        assert!(child.try_wait().unwrap().is_some());
    }
}

