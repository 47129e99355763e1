//! Empirical p-values for per-target outlier proportions.
//!
//! Null regions are processed exactly like real targets (pruned, then
//! Poisson-classified). For every retained null region the cumulative count
//! of flagged positions is kept per sample and threshold. A real target of
//! `N` positions is then compared against a statistic of each null track
//! restricted to its first `N` ranks.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use mitoqc_core::errors::{MitoQcError, Result};

use crate::poisson::ClassifiedTable;
use crate::targets::TargetStats;

/// Scalar computed from a null track over its first `N` ranks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullStatistic {
    /// Number of the first `N` ranks whose cumulative count is non-zero,
    /// compared unnormalised against the observed proportion.
    #[default]
    OccupiedCount,
    /// Share of the first `N` ranks whose cumulative count is non-zero.
    OccupiedRanks,
    /// Cumulative count at rank `min(N, len) - 1`, divided by `N`.
    OutlierFraction,
}

impl NullStatistic {
    pub fn evaluate(&self, track: &[u32], n: usize) -> f64 {
        if n == 0 || track.is_empty() {
            return 0.0;
        }
        let end = n.min(track.len());
        let occupied = track[..end].iter().filter(|&&c| c > 0).count() as f64;
        match self {
            NullStatistic::OccupiedCount => occupied,
            NullStatistic::OccupiedRanks => occupied / n as f64,
            NullStatistic::OutlierFraction => track[end - 1] as f64 / n as f64,
        }
    }
}

/// Which null values count as more extreme than the observed low proportion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowTailComparison {
    /// `null_value > prop_lo`, the same direction as the high tail.
    #[default]
    Greater,
    /// `null_value < prop_lo`.
    Less,
}

///
/// Null track index of a label: the number after the last `_`, ignoring any
/// `|<min>_<max>` bounds suffix. `null_17|000000001_000000300` has index 17.
///
pub fn null_index(label: &str) -> Result<u64> {
    let name = label.split('|').next().unwrap_or(label);
    name.rsplit_once('_')
        .and_then(|(_, idx)| idx.parse::<u64>().ok())
        .ok_or_else(|| MitoQcError::InvalidLabel(format!("{} (no numeric null index)", label)))
}

/// Cumulative outlier counts of one sample, `[threshold][null target]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleNulls {
    pub hi: Vec<Vec<Vec<u32>>>,
    pub lo: Vec<Vec<Vec<u32>>>,
}

///
/// Retained null tracks per sample and threshold. Built once per run from
/// the classified null table and queried for every real target.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullPopulation {
    pub thresholds: Vec<f64>,
    /// Retained null labels in (index, label) order.
    pub targets: Vec<String>,
    pub samples: BTreeMap<String, SampleNulls>,
}

impl NullPopulation {
    pub fn n_tracks(&self) -> usize {
        self.targets.len()
    }

    pub fn sample(&self, sample: &str) -> Option<&SampleNulls> {
        self.samples.get(sample)
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(|e| {
            MitoQcError::Checkpoint(format!("Failed to write null population {:?}: {}", path, e))
        })
    }

    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        bincode::deserialize_from(BufReader::new(file)).map_err(|e| {
            MitoQcError::Checkpoint(format!("Failed to read null population {:?}: {}", path, e))
        })
    }
}

fn cumulative(flags: impl Iterator<Item = Option<i32>>) -> Vec<u32> {
    flags
        .scan(0u32, |acc, flag| {
            if flag == Some(1) {
                *acc += 1;
            }
            Some(*acc)
        })
        .collect()
}

///
/// Build the null population from a classified null table.
///
/// # Arguments
/// - nulls: pruned and classified null regions
/// - n_pick: null regions with index `<= n_pick` are retained
pub fn build_null(nulls: &ClassifiedTable, n_pick: u64) -> Result<NullPopulation> {
    let table = &nulls.table;
    let flags = nulls.flag_indices()?;

    let groups = table.target_groups()?;
    let n_groups = groups.len();
    let mut retained = groups
        .into_iter()
        .map(|(label, rows)| Ok((null_index(&label)?, label, rows)))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .filter(|(idx, _, _)| *idx <= n_pick)
        .collect::<Vec<_>>();
    retained.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

    if retained.is_empty() {
        return Err(MitoQcError::EmptyNullPopulation(format!(
            "no null targets with index <= {}",
            n_pick
        )));
    }

    let samples = table
        .cols()
        .par_iter()
        .enumerate()
        .map(|(col_idx, col)| {
            let track = |field: usize, rows: &[usize]| {
                let data = table.column_field(col_idx, field);
                cumulative(rows.iter().map(|&r| data.get_i32(r)))
            };
            let nulls = SampleNulls {
                hi: flags
                    .iter()
                    .map(|&(hi, _)| retained.iter().map(|(_, _, rows)| track(hi, rows)).collect())
                    .collect(),
                lo: flags
                    .iter()
                    .map(|&(_, lo)| retained.iter().map(|(_, _, rows)| track(lo, rows)).collect())
                    .collect(),
            };
            (col.key.clone(), nulls)
        })
        .collect();

    info!(
        "Null population: {} of {} null targets retained for {} samples",
        retained.len(),
        n_groups,
        table.n_cols()
    );

    Ok(NullPopulation {
        thresholds: nulls.thresholds.clone(),
        targets: retained.into_iter().map(|(_, label, _)| label).collect(),
        samples,
    })
}

/// Empirical p-values of one (target, sample), one per threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPValues {
    pub p_hi: Vec<f64>,
    pub p_lo: Vec<f64>,
}

fn empirical_p<F>(tracks: &[Vec<u32>], n: usize, statistic: NullStatistic, extreme: F) -> f64
where
    F: Fn(f64) -> bool,
{
    let hits = tracks
        .iter()
        .filter(|track| extreme(statistic.evaluate(track, n)))
        .count();
    hits as f64 / tracks.len() as f64
}

///
/// Score every (target, sample) against the null population.
///
/// `p = count(null_value > prop_obs) / count(null tracks)` per threshold and
/// direction; the low tail uses `low_tail` to pick the comparison.
///
pub fn score(
    target_stats: &TargetStats,
    population: &NullPopulation,
    statistic: NullStatistic,
    low_tail: LowTailComparison,
) -> Result<Vec<TargetPValues>> {
    if target_stats.thresholds != population.thresholds {
        return Err(MitoQcError::InvalidConfig(
            "target and null thresholds differ".to_string(),
        ));
    }
    if population.n_tracks() == 0 {
        return Err(MitoQcError::EmptyNullPopulation(
            "null population has no tracks".to_string(),
        ));
    }
    if low_tail == LowTailComparison::Greater {
        warn!("Low-tail p-values count null values greater than the observed proportion");
    }

    target_stats
        .stats
        .par_iter()
        .map(|stat| {
            let nulls = population.sample(&stat.sample).ok_or_else(|| {
                MitoQcError::EmptyNullPopulation(format!("no null data for sample {}", stat.sample))
            })?;
            let thresholds = 0..target_stats.thresholds.len();

            let p_hi = thresholds
                .clone()
                .map(|i| {
                    let obs = stat.prop_hi(i);
                    empirical_p(&nulls.hi[i], stat.n, statistic, |v| v > obs)
                })
                .collect();
            let p_lo = thresholds
                .map(|i| {
                    let obs = stat.prop_lo(i);
                    match low_tail {
                        LowTailComparison::Greater => {
                            empirical_p(&nulls.lo[i], stat.n, statistic, |v| v > obs)
                        }
                        LowTailComparison::Less => {
                            empirical_p(&nulls.lo[i], stat.n, statistic, |v| v < obs)
                        }
                    }
                })
                .collect();

            Ok(TargetPValues { p_hi, p_lo })
        })
        .collect()
}
