//! # gp-types
//!
//! Core types and data structures for GridPilot: the parameter grid and its
//! combinations, per-run lifecycle records, metrics snapshots, and the shared
//! error type.

pub mod errors;
pub mod grid;
pub mod metrics;
pub mod run;

pub use errors::{GpError, GpResult};
pub use grid::{GridAxis, ParameterCombination, ParameterGrid};
pub use metrics::RunMetrics;
pub use run::{CycleResult, RunId, RunRecord, RunReport, RunStatus, CYCLE_TS_FORMAT};
