//! Deterministic cartesian-product expansion of a parameter grid.

use gp_types::{config_error, GpResult, ParameterCombination, ParameterGrid};

/// Lazy, restartable iterator over the full cartesian product of a grid.
///
/// Enumeration order is lexicographic over the grid's axis order with the
/// last axis varying fastest. The total number of items equals the product of
/// the candidate counts of every axis.
pub struct CartesianProduct<'a> {
    grid: &'a ParameterGrid,
    indices: Vec<usize>,
    done: bool,
}

impl<'a> CartesianProduct<'a> {
    /// Fails with a configuration error if the grid is empty or any axis has
    /// zero candidates.
    pub fn new(grid: &'a ParameterGrid) -> GpResult<Self> {
        if grid.is_empty() {
            return Err(config_error!("parameter grid is empty"));
        }
        for axis in grid.axes() {
            if axis.values.is_empty() {
                return Err(config_error!(
                    "grid entry '{}' has no candidate values",
                    axis.name
                ));
            }
        }
        Ok(Self {
            grid,
            indices: vec![0; grid.axes().len()],
            done: false,
        })
    }

    /// Rewind to the first combination.
    pub fn restart(&mut self) {
        self.indices.iter_mut().for_each(|i| *i = 0);
        self.done = false;
    }

    fn current(&self) -> ParameterCombination {
        let entries = self
            .grid
            .axes()
            .iter()
            .zip(&self.indices)
            .map(|(axis, &i)| (axis.name.clone(), axis.values[i].clone()))
            .collect();
        ParameterCombination::new(entries)
    }

    /// Advance the index odometer; the last axis ticks fastest.
    fn advance(&mut self) {
        let axes = self.grid.axes();
        for pos in (0..axes.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < axes[pos].values.len() {
                return;
            }
            self.indices[pos] = 0;
        }
        self.done = true;
    }
}

impl Iterator for CartesianProduct<'_> {
    type Item = ParameterCombination;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let combo = self.current();
        self.advance();
        Some(combo)
    }
}

/// Total number of combinations in the grid.
pub fn combination_count(grid: &ParameterGrid) -> usize {
    grid.axes()
        .iter()
        .map(|axis| axis.values.len())
        .product()
}

/// Expand the whole grid into a vector of combinations.
pub fn expand(grid: &ParameterGrid) -> GpResult<Vec<ParameterCombination>> {
    Ok(CartesianProduct::new(grid)?.collect())
}
