use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;
use statrs::distribution::{DiscreteCDF, Poisson};

use mitoqc_core::errors::{MitoQcError, Result};
use mitoqc_core::models::{ColumnData, ElementType, FieldSpec, KeyedTable, SampleColumn, Schema};

pub const DEFAULT_THRESHOLDS: [f64; 5] = [0.025, 5e-5, 1e-4, 1e-6, 3e-9];

pub const P_HI_FIELD: &str = "p_hi";
pub const P_LO_FIELD: &str = "p_lo";

///
/// Column suffix of the threshold at position `idx`: the first threshold
/// has none, the others are written in exponent form (`_5e-5`).
///
pub fn threshold_suffix(idx: usize, alpha: f64) -> String {
    match idx {
        0 => String::new(),
        _ => format!("_{:e}", alpha),
    }
}

pub fn validate_thresholds(thresholds: &[f64]) -> Result<()> {
    if thresholds.is_empty() {
        return Err(MitoQcError::InvalidConfig(
            "at least one significance threshold is required".to_string(),
        ));
    }
    for (idx, &alpha) in thresholds.iter().enumerate() {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(MitoQcError::InvalidConfig(format!(
                "threshold {} is outside (0, 1]",
                alpha
            )));
        }
        let suffix = threshold_suffix(idx, alpha);
        if (0..idx).any(|j| threshold_suffix(j, thresholds[j]) == suffix) {
            return Err(MitoQcError::InvalidConfig(format!(
                "threshold {} is given more than once",
                alpha
            )));
        }
    }
    Ok(())
}

///
/// Exact Poisson tails for one sample's mean coverage.
///
/// `upper(k) = P(X >= k)` and `lower(k) = P(X <= k)`. A mean of exactly
/// zero is the point mass at 0.
///
#[derive(Debug, Clone)]
pub struct PoissonTails {
    dist: Option<Poisson>,
}

impl PoissonTails {
    pub fn new(mean: f64) -> Result<Self> {
        if !mean.is_finite() || mean < 0.0 {
            return Err(MitoQcError::InvalidConfig(format!(
                "mean coverage must be finite and non-negative, got {}",
                mean
            )));
        }
        if mean == 0.0 {
            return Ok(PoissonTails { dist: None });
        }
        let dist = Poisson::new(mean)
            .map_err(|e| MitoQcError::InvalidConfig(format!("bad Poisson mean {}: {}", mean, e)))?;
        Ok(PoissonTails { dist: Some(dist) })
    }

    pub fn upper(&self, observed: i64) -> f64 {
        if observed <= 0 {
            return 1.0;
        }
        match &self.dist {
            Some(dist) => dist.sf((observed - 1) as u64),
            None => 0.0,
        }
    }

    pub fn lower(&self, observed: i64) -> f64 {
        if observed < 0 {
            return 0.0;
        }
        match &self.dist {
            Some(dist) => dist.cdf(observed as u64),
            None => 1.0,
        }
    }
}

/// A table annotated with Poisson p-values and per-threshold outlier flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTable {
    pub table: KeyedTable,
    pub thresholds: Vec<f64>,
}

impl ClassifiedTable {
    pub fn suffix(&self, idx: usize) -> String {
        threshold_suffix(idx, self.thresholds[idx])
    }

    pub fn hi_field(&self, idx: usize) -> String {
        format!("is_hi{}", self.suffix(idx))
    }

    pub fn lo_field(&self, idx: usize) -> String {
        format!("is_lo{}", self.suffix(idx))
    }

    /// Field indices of the (hi, lo) flags, one pair per threshold.
    pub fn flag_indices(&self) -> Result<Vec<(usize, usize)>> {
        let schema = self.table.schema();
        (0..self.thresholds.len())
            .map(|idx| {
                Ok((
                    schema.require_field(&self.hi_field(idx))?,
                    schema.require_field(&self.lo_field(idx))?,
                ))
            })
            .collect()
    }
}

///
/// Mean of a numeric field per sample over non-null entries. Samples with
/// no value at all are left out.
///
pub fn mean_coverage_per_sample(table: &KeyedTable, field: &str) -> Result<BTreeMap<String, f64>> {
    let field_idx = table.schema().require_field(field)?;
    let mut means = BTreeMap::new();
    for (col_idx, col) in table.cols().iter().enumerate() {
        let data = table.column_field(col_idx, field_idx);
        let values: Vec<f64> = (0..data.len()).filter_map(|i| data.get_f64(i)).collect();
        if !values.is_empty() {
            means.insert(
                col.key.clone(),
                values.iter().sum::<f64>() / values.len() as f64,
            );
        }
    }
    Ok(means)
}

struct SampleCalls {
    p_hi: Vec<Option<f64>>,
    p_lo: Vec<Option<f64>>,
    hi: Vec<Vec<Option<i32>>>,
    lo: Vec<Vec<Option<i32>>>,
}

fn classify_sample(data: &ColumnData, mean: f64, thresholds: &[f64]) -> Result<SampleCalls> {
    let tails = PoissonTails::new(mean)?;
    let n = data.len();
    let mut calls = SampleCalls {
        p_hi: Vec::with_capacity(n),
        p_lo: Vec::with_capacity(n),
        hi: vec![Vec::with_capacity(n); thresholds.len()],
        lo: vec![Vec::with_capacity(n); thresholds.len()],
    };

    for row in 0..n {
        match data.get_i32(row) {
            Some(observed) => {
                let p_hi = tails.upper(observed as i64);
                let p_lo = tails.lower(observed as i64);
                calls.p_hi.push(Some(p_hi));
                calls.p_lo.push(Some(p_lo));
                for (idx, &alpha) in thresholds.iter().enumerate() {
                    calls.hi[idx].push(Some((p_hi <= alpha) as i32));
                    calls.lo[idx].push(Some((p_lo <= alpha) as i32));
                }
            }
            None => {
                calls.p_hi.push(None);
                calls.p_lo.push(None);
                for idx in 0..thresholds.len() {
                    calls.hi[idx].push(None);
                    calls.lo[idx].push(None);
                }
            }
        }
    }
    Ok(calls)
}

///
/// Flag abnormally high or low coverage with an exact Poisson test against
/// each sample's mean coverage, at every threshold in one pass.
///
/// # Arguments
/// - table: coverage table
/// - means: mean coverage per sample; every sample must have one
/// - value_field: int32 coverage field
/// - thresholds: ordered significance levels
pub fn classify(
    table: &KeyedTable,
    means: &BTreeMap<String, f64>,
    value_field: &str,
    thresholds: &[f64],
) -> Result<ClassifiedTable> {
    validate_thresholds(thresholds)?;
    let field_idx = table.schema().require_field(value_field)?;
    if table.schema().fields[field_idx].element_type != ElementType::Int32 {
        return Err(MitoQcError::SchemaMismatch(format!(
            "Field {} must hold int32 counts",
            value_field
        )));
    }
    let sample_means = table
        .cols()
        .iter()
        .map(|col| {
            means
                .get(&col.key)
                .copied()
                .ok_or_else(|| MitoQcError::MissingMeanCoverage(col.key.clone()))
        })
        .collect::<Result<Vec<f64>>>()?;

    let calls = table
        .cols()
        .par_iter()
        .zip(sample_means.par_iter())
        .map(|(col, &mean)| classify_sample(&col.fields[field_idx], mean, thresholds))
        .collect::<Result<Vec<SampleCalls>>>()?;

    let mut fields = table.schema().fields.clone();
    fields.push(FieldSpec::new(P_HI_FIELD, ElementType::Float64));
    fields.push(FieldSpec::new(P_LO_FIELD, ElementType::Float64));
    for (idx, &alpha) in thresholds.iter().enumerate() {
        let suffix = threshold_suffix(idx, alpha);
        fields.push(FieldSpec::new(&format!("is_hi{}", suffix), ElementType::Int32));
        fields.push(FieldSpec::new(&format!("is_lo{}", suffix), ElementType::Int32));
    }
    let schema = Schema::new(table.schema().key_kind, fields);

    let cols = table
        .cols()
        .iter()
        .zip(calls)
        .map(|(col, calls)| {
            let mut fields = col.fields.clone();
            fields.push(ColumnData::Float64(calls.p_hi));
            fields.push(ColumnData::Float64(calls.p_lo));
            for (hi, lo) in calls.hi.into_iter().zip(calls.lo) {
                fields.push(ColumnData::Int32(hi));
                fields.push(ColumnData::Int32(lo));
            }
            SampleColumn {
                key: col.key.clone(),
                fields,
            }
        })
        .collect();

    debug!(
        "Classified {} rows for {} samples at {} thresholds",
        table.n_rows(),
        table.n_cols(),
        thresholds.len()
    );

    Ok(ClassifiedTable {
        table: KeyedTable::new(schema, table.rows().to_vec(), cols)?,
        thresholds: thresholds.to_vec(),
    })
}
