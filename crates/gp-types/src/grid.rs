//! Parameter grid and combination types.
//!
//! A [`ParameterGrid`] is the declared search space: one ordered candidate
//! list per parameter name, in document order. A [`ParameterCombination`] is
//! one fully specified point in that space, with a canonical order-independent
//! identity used for deduplication across cycles.

use serde::ser::SerializeMap;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

use crate::{config_error, GpResult};

/// A single dimension of the search space: a parameter name and its ordered
/// candidate values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridAxis {
    pub name: String,
    pub values: Vec<Value>,
}

/// The full search space, preserving the declaration order of the grid
/// document. Keys are unique; value order matters for enumeration order, not
/// for selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterGrid {
    axes: Vec<GridAxis>,
}

impl ParameterGrid {
    /// Build a grid from a YAML mapping of `name -> [candidates]`.
    ///
    /// Fails if the mapping is empty, a key is not a string, a value is not a
    /// sequence, or any candidate list is empty.
    pub fn from_mapping(mapping: Mapping) -> GpResult<Self> {
        let mut axes = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| config_error!("grid keys must be strings, got: {key:?}"))?
                .to_string();
            let values = value
                .as_sequence()
                .ok_or_else(|| config_error!("grid entry '{name}' must be a list of candidates"))?
                .clone();
            if values.is_empty() {
                return Err(config_error!("grid entry '{name}' has no candidate values"));
            }
            axes.push(GridAxis { name, values });
        }
        if axes.is_empty() {
            return Err(config_error!("parameter grid is empty"));
        }
        Ok(Self { axes })
    }

    /// Parse a grid from YAML text.
    pub fn from_yaml_str(text: &str) -> GpResult<Self> {
        let mapping: Mapping = serde_yaml::from_str(text)?;
        Self::from_mapping(mapping)
    }

    /// The built-in default grid for the funding-rate-arb demo strategy, used
    /// when no grid config is supplied.
    pub fn default_demo_grid() -> Self {
        fn axis(name: &str, values: Vec<Value>) -> GridAxis {
            GridAxis {
                name: name.to_string(),
                values,
            }
        }
        fn floats(values: &[f64]) -> Vec<Value> {
            values.iter().map(|v| Value::from(*v)).collect()
        }
        fn ints(values: &[i64]) -> Vec<Value> {
            values.iter().map(|v| Value::from(*v)).collect()
        }

        Self {
            axes: vec![
                axis(
                    "min_funding_rate_profitability",
                    floats(&[0.0006, 0.0008, 0.001, 0.0012, 0.0015, 0.002, 0.0025]),
                ),
                axis(
                    "profitability_to_take_profit",
                    floats(&[0.004, 0.006, 0.008, 0.01, 0.015, 0.02]),
                ),
                axis(
                    "funding_rate_diff_stop_loss",
                    floats(&[-0.0003, -0.0005, -0.0008, -0.001, -0.0015, -0.002]),
                ),
                axis("max_slippage_pct", floats(&[0.002, 0.003, 0.004, 0.005, 0.0075])),
                axis(
                    "min_order_book_depth_multiplier",
                    floats(&[2.0, 2.5, 3.0, 3.5, 4.0]),
                ),
                axis(
                    "min_time_to_next_funding_seconds",
                    ints(&[120, 240, 300, 600, 900]),
                ),
                axis("position_size_quote_pct", floats(&[0.25, 0.5, 0.75, 1.0])),
                axis("max_positions_per_connector", ints(&[1, 2, 3])),
                axis("leverage", ints(&[3, 5, 7, 10])),
            ],
        }
    }

    pub fn axes(&self) -> &[GridAxis] {
        &self.axes
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

/// One fully specified point in the search space: exactly one value per grid
/// key, kept in grid axis order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterCombination {
    entries: Vec<(String, Value)>,
}

impl ParameterCombination {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical order-independent identity: a sorted-key JSON rendering of
    /// the key/value set. Two combinations with the same entries have the
    /// same identity regardless of construction order.
    pub fn identity(&self) -> String {
        let sorted: BTreeMap<&str, &Value> = self
            .entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        // Grid candidates are plain scalars; non-JSON-representable values
        // fall back to the (still sorted, still deterministic) debug form.
        serde_json::to_string(&sorted).unwrap_or_else(|_| format!("{sorted:?}"))
    }
}

impl Serialize for ParameterCombination {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_from_yaml_preserves_order() {
        let grid = ParameterGrid::from_yaml_str("b: [1, 2]\na: [3]\n").unwrap();
        let names: Vec<&str> = grid.axes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn empty_grid_rejected() {
        assert!(ParameterGrid::from_mapping(Mapping::new()).is_err());
    }

    #[test]
    fn empty_axis_rejected() {
        let err = ParameterGrid::from_yaml_str("a: []\n").unwrap_err();
        assert!(err.to_string().contains("no candidate values"));
    }

    #[test]
    fn non_sequence_axis_rejected() {
        assert!(ParameterGrid::from_yaml_str("a: 5\n").is_err());
    }

    #[test]
    fn identity_is_order_independent() {
        let a = ParameterCombination::new(vec![
            ("x".into(), Value::from(1)),
            ("y".into(), Value::from(2.5)),
        ]);
        let b = ParameterCombination::new(vec![
            ("y".into(), Value::from(2.5)),
            ("x".into(), Value::from(1)),
        ]);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn identity_distinguishes_values() {
        let a = ParameterCombination::new(vec![("x".into(), Value::from(1))]);
        let b = ParameterCombination::new(vec![("x".into(), Value::from(2))]);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn combination_serializes_as_map() {
        let combo = ParameterCombination::new(vec![
            ("leverage".into(), Value::from(5)),
            ("max_slippage_pct".into(), Value::from(0.003)),
        ]);
        let json = serde_json::to_string(&combo).unwrap();
        assert_eq!(json, r#"{"leverage":5,"max_slippage_pct":0.003}"#);
    }

    #[test]
    fn default_demo_grid_is_well_formed() {
        let grid = ParameterGrid::default_demo_grid();
        assert_eq!(grid.axes().len(), 9);
        assert!(grid.axes().iter().all(|a| !a.values.is_empty()));
    }
}
