use std::collections::BTreeMap;

use log::info;

use mitoqc_core::errors::Result;
use mitoqc_core::models::KeyedTable;
use mitoqc_io::consts::COVERAGE_FIELD;

use crate::bounds::{BoundsMode, DEFAULT_LABEL_WIDTH, bounds_provider, prune};
use crate::nulls::{LowTailComparison, NullPopulation, NullStatistic, TargetPValues, build_null, score};
use crate::poisson::{
    ClassifiedTable, DEFAULT_THRESHOLDS, classify, mean_coverage_per_sample, validate_thresholds,
};
use crate::targets::{TargetStats, per_target_stats};

pub const DEFAULT_TRIM_BASES: i64 = 500;
pub const DEFAULT_N_PICK: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct NumtAnalysisParams {
    pub trim_bases: i64,
    pub bounds_mode: BoundsMode,
    pub label_width: usize,
    pub value_field: String,
    pub thresholds: Vec<f64>,
    pub n_pick: u64,
    pub null_statistic: NullStatistic,
    pub low_tail: LowTailComparison,
}

impl Default for NumtAnalysisParams {
    fn default() -> Self {
        NumtAnalysisParams {
            trim_bases: DEFAULT_TRIM_BASES,
            bounds_mode: BoundsMode::Derive,
            label_width: DEFAULT_LABEL_WIDTH,
            value_field: COVERAGE_FIELD.to_string(),
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            n_pick: DEFAULT_N_PICK,
            null_statistic: NullStatistic::default(),
            low_tail: LowTailComparison::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NumtReport {
    pub stats: TargetStats,
    pub p_values: Option<Vec<TargetPValues>>,
    pub population: Option<NullPopulation>,
}

/// Prune one region table, then classify it against the per-sample `means`.
pub fn prune_and_classify(
    table: &KeyedTable,
    means: &BTreeMap<String, f64>,
    params: &NumtAnalysisParams,
) -> Result<ClassifiedTable> {
    let provider = bounds_provider(params.bounds_mode, params.trim_bases, params.label_width)?;
    let pruned = prune(table, provider.as_ref())?;
    classify(&pruned, means, &params.value_field, &params.thresholds)
}

///
/// Full NUMT analysis: per-target outlier counts for `targets`, and when a
/// null table is given, empirical p-values against its null population.
///
/// # Arguments
/// - targets: coverage over real target regions
/// - nulls: coverage over null regions, or `None` for a target-only run
/// - means: per-sample mean coverage from a QC table; without one, each
///   sample's mean over the unpruned target table is used for both tables
/// - params: pruning, threshold and null-scoring settings
pub fn run_numt_analysis(
    targets: &KeyedTable,
    nulls: Option<&KeyedTable>,
    means: Option<&BTreeMap<String, f64>>,
    params: &NumtAnalysisParams,
) -> Result<NumtReport> {
    validate_thresholds(&params.thresholds)?;

    let means = match means {
        Some(means) => means.clone(),
        None => mean_coverage_per_sample(targets, &params.value_field)?,
    };

    let classified = prune_and_classify(targets, &means, params)?;
    let stats = per_target_stats(&classified)?;
    info!("Computed {} per-target stats", stats.stats.len());

    let Some(nulls) = nulls else {
        return Ok(NumtReport {
            stats,
            p_values: None,
            population: None,
        });
    };

    let null_classified = prune_and_classify(nulls, &means, params)?;
    let population = build_null(&null_classified, params.n_pick)?;
    let p_values = score(&stats, &population, params.null_statistic, params.low_tail)?;

    Ok(NumtReport {
        stats,
        p_values: Some(p_values),
        population: Some(population),
    })
}
