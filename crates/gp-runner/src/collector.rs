//! Tolerant metrics-log ingestion.
//!
//! Workers append one CSV row per metrics interval while we read without any
//! locking, so a read may race a write and see a truncated final line. The
//! contract here is snapshot-only and best effort: the last fully parsable
//! row wins, anything malformed is skipped, and a missing or header-only file
//! is "no data" rather than an error.

use csv::StringRecord;
use std::path::Path;
use tracing::debug;

use gp_types::RunMetrics;

/// Read the most recent valid metrics snapshot from a run's metrics log.
pub fn read_latest_metrics(path: &Path) -> Option<RunMetrics> {
    if !path.is_file() {
        return None;
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .ok()?;

    let headers = reader.headers().ok()?.clone();
    let mut indices = [0usize; 4];
    for (slot, column) in indices.iter_mut().zip(RunMetrics::COLUMNS) {
        *slot = headers.iter().position(|h| h == column)?;
    }

    let mut latest = None;
    for record in reader.records() {
        let Ok(record) = record else {
            continue;
        };
        if let Some(metrics) = parse_row(&record, &indices) {
            latest = Some(metrics);
        } else {
            debug!(path = %path.display(), "skipping unparsable metrics row");
        }
    }
    latest
}

/// A row is a `RunMetrics` only if all four fields are present and numeric.
fn parse_row(record: &StringRecord, indices: &[usize; 4]) -> Option<RunMetrics> {
    let field = |slot: usize| -> Option<f64> {
        record.get(indices[slot])?.trim().parse::<f64>().ok()
    };
    Some(RunMetrics {
        total_pnl: field(0)?,
        max_drawdown_pct: field(1)?,
        max_drawdown: field(2)?,
        equity: field(3)?,
    })
}
