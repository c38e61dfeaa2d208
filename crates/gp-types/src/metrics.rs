//! Typed run-metrics snapshot.

use serde::{Deserialize, Serialize};

/// A point-in-time performance snapshot for one run, parsed from the last
/// well-formed row of the run's metrics log. All four fields are required; a
/// row that does not populate all of them is not a `RunMetrics`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_pnl: f64,
    pub max_drawdown_pct: f64,
    pub max_drawdown: f64,
    pub equity: f64,
}

impl RunMetrics {
    /// Column names expected in the metrics log header, in canonical order.
    pub const COLUMNS: [&'static str; 4] =
        ["total_pnl", "max_drawdown_pct", "max_drawdown", "equity"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_all_fields() {
        let metrics = RunMetrics {
            total_pnl: 7.0,
            max_drawdown_pct: 2.0,
            max_drawdown: 3.0,
            equity: 120.0,
        };
        let json = serde_json::to_value(metrics).unwrap();
        assert_eq!(json["total_pnl"], 7.0);
        assert_eq!(json["equity"], 120.0);
    }
}
