//! Deterministic best-run selection.

use std::cmp::Ordering;

use gp_types::{RunMetrics, RunReport};

/// Total order over valid metric snapshots: ascending by `-total_pnl`, then
/// ascending by `max_drawdown_pct`. The minimum under this order is the best
/// run (maximize profit, tie-break on minimal drawdown).
fn rank(a: &RunMetrics, b: &RunMetrics) -> Ordering {
    b.total_pnl
        .total_cmp(&a.total_pnl)
        .then_with(|| a.max_drawdown_pct.total_cmp(&b.max_drawdown_pct))
}

/// Pick the single best run among those with a valid metrics snapshot.
/// Returns `None` when no run produced metrics.
pub fn select_best(reports: &[RunReport]) -> Option<&RunReport> {
    reports
        .iter()
        .filter(|report| report.metrics.is_some())
        .min_by(|a, b| {
            // filter guarantees both snapshots are present
            match (&a.metrics, &b.metrics) {
                (Some(ma), Some(mb)) => rank(ma, mb),
                _ => Ordering::Equal,
            }
        })
}
