//! Base-config loading, startup validation, and run-config materialization.
//!
//! The base config is an order-preserving YAML mapping. It is read once at
//! the start of each cycle and mutated only by [`crate::PromotionEngine`],
//! which goes through [`write_yaml_atomic`] so a concurrent reader never sees
//! a partially written file.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;
use tracing::warn;

use gp_types::{config_error, validation_error, GpResult, ParameterCombination, RunId};

/// Token count above which running many parallel demos risks exchange rate
/// limits.
const LARGE_TOKEN_SET: usize = 60;

/// Load the base config as an order-preserving YAML mapping. An empty file is
/// an empty config.
pub fn load_base_config(path: &Path) -> GpResult<Mapping> {
    let text = fs::read_to_string(path)
        .map_err(|e| config_error!("cannot read base config {}: {e}", path.display()))?;
    let mapping: Option<Mapping> = serde_yaml::from_str(&text)?;
    Ok(mapping.unwrap_or_default())
}

fn sequence_len(cfg: &Mapping, key: &str) -> usize {
    cfg.get(key)
        .and_then(Value::as_sequence)
        .map(|seq| seq.len())
        .unwrap_or(0)
}

fn flag_enabled(cfg: &Mapping, key: &str) -> bool {
    cfg.get(key).and_then(Value::as_bool).unwrap_or(true)
}

/// Startup validation of the base config.
///
/// Fatal: fewer than two connectors, or no traded tokens. Disabled safety
/// flags and oversized token sets only warn.
pub fn validate_base_config(cfg: &Mapping, parallel: usize) -> GpResult<()> {
    let connectors = sequence_len(cfg, "connectors");
    if connectors < 2 {
        return Err(validation_error!(
            "base config needs at least 2 connectors, found {connectors}"
        ));
    }
    let tokens = sequence_len(cfg, "tokens");
    if tokens == 0 {
        return Err(validation_error!("base config needs at least 1 token"));
    }

    if !flag_enabled(cfg, "position_validation_enabled") {
        warn!("position_validation_enabled is disabled in base config");
    }
    if !flag_enabled(cfg, "emergency_close_on_imbalance") {
        warn!("emergency_close_on_imbalance is disabled in base config");
    }
    if tokens > LARGE_TOKEN_SET && parallel >= 4 {
        warn!(
            tokens,
            parallel, "large token set with this many parallel demos may hit rate limits"
        );
    }

    Ok(())
}

/// Override/insert every parameter of `params` into `cfg`.
pub fn merge_params(cfg: &mut Mapping, params: &ParameterCombination) {
    for (key, value) in params.entries() {
        cfg.insert(Value::from(key.clone()), value.clone());
    }
}

/// Build one self-contained run config: BaseConfig ⊕ selected parameters ⊕
/// run metadata. Never mutates the base.
pub fn materialize_run_config(
    base: &Mapping,
    params: &ParameterCombination,
    run_id: &RunId,
    metrics_path: &Path,
    metrics_interval_secs: u64,
) -> Mapping {
    let mut cfg = base.clone();
    merge_params(&mut cfg, params);
    cfg.insert(Value::from("demo_mode"), Value::from(true));
    cfg.insert(Value::from("demo_run_id"), Value::from(run_id.as_str()));
    cfg.insert(Value::from("demo_metrics_enabled"), Value::from(true));
    cfg.insert(
        Value::from("demo_metrics_file"),
        Value::from(metrics_path.to_string_lossy().into_owned()),
    );
    cfg.insert(
        Value::from("demo_metrics_interval_seconds"),
        Value::from(metrics_interval_secs),
    );
    cfg
}

/// Persist a YAML mapping with write-then-rename so readers never observe a
/// partial file.
pub fn write_yaml_atomic(path: &Path, cfg: &Mapping) -> GpResult<()> {
    let text = serde_yaml::to_string(cfg)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| config_error!("invalid config path: {}", path.display()))?;
    let tmp = path.with_file_name(format!("{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
