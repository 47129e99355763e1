pub mod cli;
pub mod handlers;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mitoqc_io::consts::COVERAGE_FIELD;
use mitoqc_stats::bounds::{BoundsMode, DEFAULT_LABEL_WIDTH};
use mitoqc_stats::nulls::{LowTailComparison, NullStatistic};
use mitoqc_stats::pipeline::{DEFAULT_N_PICK, DEFAULT_TRIM_BASES, NumtAnalysisParams};
use mitoqc_stats::poisson::DEFAULT_THRESHOLDS;

pub const DEFAULT_CHUNK_SIZE: usize = 100;

///
/// Run settings shared by `combine` and `numts`. Any field left out of the
/// TOML file keeps its default; command line flags override both.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub trim_bases: i64,
    pub n_pick: u64,
    pub chunk_size: usize,
    pub thresholds: Vec<f64>,
    pub numt_only: bool,
    pub bounds_mode: BoundsMode,
    pub label_width: usize,
    pub null_statistic: NullStatistic,
    pub low_tail_comparison: LowTailComparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trim_bases: DEFAULT_TRIM_BASES,
            n_pick: DEFAULT_N_PICK,
            chunk_size: DEFAULT_CHUNK_SIZE,
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            numt_only: false,
            bounds_mode: BoundsMode::default(),
            label_width: DEFAULT_LABEL_WIDTH,
            null_statistic: NullStatistic::default(),
            low_tail_comparison: LowTailComparison::default(),
            threads: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {:?}", path))?;
        Ok(())
    }

    pub fn numt_params(&self) -> NumtAnalysisParams {
        NumtAnalysisParams {
            trim_bases: self.trim_bases,
            bounds_mode: self.bounds_mode,
            label_width: self.label_width,
            value_field: COVERAGE_FIELD.to_string(),
            thresholds: self.thresholds.clone(),
            n_pick: self.n_pick,
            null_statistic: self.null_statistic,
            low_tail: self.low_tail_comparison,
        }
    }
}
