//! # gp-search
//!
//! Search-space mechanics for GridPilot: deterministic cartesian-product
//! expansion of a [`gp_types::ParameterGrid`] and seeded, deduplicating
//! per-cycle combination selection.

mod product;
mod selector;

pub use product::{combination_count, expand, CartesianProduct};
pub use selector::ComboSelector;
