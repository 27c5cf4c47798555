//! JSON configuration loading for pipeline runs.

use crate::pipeline::SsfParams;
use chrono::Duration;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// JSON-friendly mirror of [`SsfParams`]: durations in minutes, everything
/// else verbatim. Missing fields fall back to the pipeline defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub rate_minutes: i64,
    pub tolerance_minutes: i64,
    pub min_burst_length: usize,
    pub n_controls: usize,
    pub zero_length_epsilon: f64,
    pub optimizer_max_iter: usize,
    pub aic_threshold: f64,
    pub p_threshold: f64,
    pub random_seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let params = SsfParams::default();
        Self {
            rate_minutes: params.rate.num_minutes(),
            tolerance_minutes: params.tolerance.num_minutes(),
            min_burst_length: params.min_burst_length,
            n_controls: params.n_controls,
            zero_length_epsilon: params.zero_length_epsilon,
            optimizer_max_iter: params.optimizer_max_iter,
            aic_threshold: params.aic_threshold,
            p_threshold: params.p_threshold,
            random_seed: params.random_seed,
        }
    }
}

impl RuntimeConfig {
    pub fn into_params(self) -> SsfParams {
        SsfParams {
            rate: Duration::minutes(self.rate_minutes),
            tolerance: Duration::minutes(self.tolerance_minutes),
            min_burst_length: self.min_burst_length,
            n_controls: self.n_controls,
            zero_length_epsilon: self.zero_length_epsilon,
            optimizer_max_iter: self.optimizer_max_iter,
            aic_threshold: self.aic_threshold,
            p_threshold: self.p_threshold,
            random_seed: self.random_seed,
        }
    }
}

pub fn load_config(path: &Path) -> Result<SsfParams, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config.into_params())
}
