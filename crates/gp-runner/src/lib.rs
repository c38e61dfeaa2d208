//! # gp-runner
//!
//! The GridPilot orchestration layer: materializes per-run config artifacts,
//! supervises worker processes to the cycle horizon, scores runs from their
//! metrics logs, and promotes the best parameter set into the persistent base
//! configuration.

pub mod collector;
pub mod config;
pub mod cycle;
pub mod promote;
pub mod selection;
pub mod supervisor;
pub mod worker;

pub use cycle::{Orchestrator, OrchestratorConfig};
pub use promote::PromotionEngine;
pub use supervisor::{ProcessSupervisor, SupervisorConfig};
pub use worker::{ProcessWorker, Worker, WorkerCommand, WorkerState};
