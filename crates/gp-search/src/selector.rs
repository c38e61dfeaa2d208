//! Per-cycle combination selection with cross-cycle deduplication.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use tracing::info;

use gp_types::{GpResult, ParameterCombination, ParameterGrid};

use crate::product;

/// Samples a bounded subset of not-yet-used combinations each cycle.
///
/// The shuffle is driven by a seeded deterministic RNG, so the same seed
/// replays the same selection sequence across orchestrator runs. Used
/// identities persist across cycles; when fewer than `parallel` unused
/// combinations remain, the used set is cleared, the list is re-shuffled, and
/// the first `parallel` combinations are taken outright (which may repeat
/// recently used combinations for that one cycle).
pub struct ComboSelector {
    combos: Vec<ParameterCombination>,
    used: HashSet<String>,
    rng: StdRng,
}

impl ComboSelector {
    /// Expands the grid up front; fails on an empty grid.
    pub fn new(grid: &ParameterGrid, seed: u64) -> GpResult<Self> {
        let combos = product::expand(grid)?;
        info!(combinations = combos.len(), seed, "combo selector initialized");
        Ok(Self {
            combos,
            used: HashSet::new(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Total number of combinations in the expanded grid.
    pub fn combination_count(&self) -> usize {
        self.combos.len()
    }

    /// Number of identities consumed since the last exhaustion reset.
    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    /// Pick up to `parallel` combinations for one cycle.
    pub fn select(&mut self, parallel: usize) -> Vec<ParameterCombination> {
        self.combos.shuffle(&mut self.rng);

        let mut selected = Vec::with_capacity(parallel);
        for combo in &self.combos {
            let identity = combo.identity();
            if self.used.contains(&identity) {
                continue;
            }
            selected.push(combo.clone());
            self.used.insert(identity);
            if selected.len() >= parallel {
                break;
            }
        }

        if selected.len() < parallel {
            // Grid exhausted: start a fresh pass and accept possible repeats
            // of recently used combinations for this cycle.
            info!(
                remaining = selected.len(),
                requested = parallel,
                "grid exhausted, resetting used-combination set"
            );
            self.used.clear();
            self.combos.shuffle(&mut self.rng);
            selected = self
                .combos
                .iter()
                .take(parallel)
                .cloned()
                .collect();
        }

        selected
    }
}
