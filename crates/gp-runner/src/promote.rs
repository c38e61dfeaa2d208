//! Promotion of the winning parameter set into the base config.

use serde_yaml::Mapping;
use std::path::PathBuf;
use tracing::info;

use gp_types::{GpResult, ParameterCombination};

use crate::config;

/// Writes the best combination's parameters back into the persistent base
/// configuration. This is the only path by which the base config changes, and
/// it runs only after every run of the cycle has stopped.
pub struct PromotionEngine {
    base_config_path: PathBuf,
    enabled: bool,
}

impl PromotionEngine {
    pub fn new(base_config_path: PathBuf, enabled: bool) -> Self {
        Self {
            base_config_path,
            enabled,
        }
    }

    /// Merge `params` over `base` and persist atomically. Returns the merged
    /// config, or `None` when promotion is disabled.
    pub fn promote(
        &self,
        base: &Mapping,
        params: &ParameterCombination,
    ) -> GpResult<Option<Mapping>> {
        if !self.enabled {
            info!("auto-promotion disabled, base config left unchanged");
            return Ok(None);
        }

        let mut merged = base.clone();
        config::merge_params(&mut merged, params);
        config::write_yaml_atomic(&self.base_config_path, &merged)?;
        info!(
            path = %self.base_config_path.display(),
            parameters = params.len(),
            "best parameters promoted into base config"
        );
        Ok(Some(merged))
    }
}
