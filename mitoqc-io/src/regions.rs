use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use fxhash::{FxHashMap, FxHashSet};
use log::{debug, warn};

use mitoqc_core::models::{
    ColumnData, ElementType, FieldSpec, KeyedTable, RowKey, RowKeyKind, SampleColumn, Schema,
    Value,
};

use crate::consts::*;
use crate::coverage::parse_row_key;
use crate::tsv::{header_index, open_tsv, optional_header_index};

///
/// A region (target or null) coverage table plus any per-sample mean
/// coverage carried alongside it.
///
#[derive(Debug, Clone)]
pub struct RegionTable {
    pub table: KeyedTable,
    pub mean_coverage: BTreeMap<String, f64>,
}

///
/// Read a long region table: `s chrom pos target coverage [mean_coverage]`,
/// one line per (sample, position, target). The result is keyed by
/// (chrom, pos, target) with one `coverage` field; positions a sample has
/// no line for are null.
///
pub fn read_region_table(path: &Path) -> Result<RegionTable> {
    let mut reader = open_tsv(path)?;
    let headers = reader.headers()?.clone();

    let sample_idx = header_index(&headers, SAMPLE_COL, path)?;
    let chrom_idx = header_index(&headers, CHROM_COL, path)?;
    let pos_idx = header_index(&headers, POS_COL, path)?;
    let target_idx = header_index(&headers, TARGET_COL, path)?;
    let coverage_idx = header_index(&headers, COVERAGE_FIELD, path)?;
    let mean_idx = optional_header_index(&headers, MEAN_COVERAGE_COL);

    let mut samples: Vec<String> = Vec::new();
    let mut sample_lookup: FxHashMap<String, usize> = FxHashMap::default();
    let mut mean_coverage: BTreeMap<String, f64> = BTreeMap::new();
    let mut records: Vec<(usize, RowKey, Option<i32>)> = Vec::new();

    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read {:?}", path))?;
        let sample = record.get(sample_idx).unwrap_or_default();
        let col = match sample_lookup.get(sample) {
            Some(&col) => col,
            None => {
                samples.push(sample.to_string());
                sample_lookup.insert(sample.to_string(), samples.len() - 1);
                samples.len() - 1
            }
        };

        let key = parse_row_key(&record, chrom_idx, pos_idx, Some(target_idx))
            .with_context(|| format!("Invalid row {} in {:?}", line + 2, path))?;
        let coverage = match Value::parse(record.get(coverage_idx).unwrap_or(""), ElementType::Int32)
            .with_context(|| format!("Invalid coverage on row {} in {:?}", line + 2, path))?
        {
            Some(Value::Int32(x)) => Some(x),
            _ => None,
        };

        if let Some(idx) = mean_idx {
            let mean = Value::parse(record.get(idx).unwrap_or(""), ElementType::Float64)
                .with_context(|| format!("Invalid mean coverage on row {} in {:?}", line + 2, path))?
                .and_then(|v| v.as_f64());
            if let Some(mean) = mean {
                mean_coverage.entry(sample.to_string()).or_insert(mean);
            }
        }

        records.push((col, key, coverage));
    }

    if records.is_empty() {
        warn!("Region table {:?} has no rows", path);
    }

    let mut rows: Vec<RowKey> = records.iter().map(|(_, key, _)| key.clone()).collect();
    rows.sort();
    rows.dedup();

    let mut values: Vec<Vec<Option<i32>>> = vec![vec![None; rows.len()]; samples.len()];
    let mut seen: FxHashSet<(usize, usize)> = FxHashSet::default();
    for (col, key, coverage) in records {
        let row = rows
            .binary_search(&key)
            .map_err(|_| anyhow::anyhow!("Row {} vanished while indexing {:?}", key, path))?;
        if !seen.insert((col, row)) {
            anyhow::bail!(
                "Duplicate row {} for sample {} in {:?}",
                key,
                samples[col],
                path
            );
        }
        values[col][row] = coverage;
    }

    debug!(
        "Read {} rows for {} samples from {:?}",
        rows.len(),
        samples.len(),
        path
    );

    let schema = Schema::new(
        RowKeyKind::LocusTarget,
        vec![FieldSpec::new(COVERAGE_FIELD, ElementType::Int32)],
    );
    let cols = samples
        .into_iter()
        .zip(values)
        .map(|(key, column)| SampleColumn {
            key,
            fields: vec![ColumnData::Int32(column)],
        })
        .collect();
    let table = KeyedTable::new(schema, rows, cols)
        .with_context(|| format!("Failed to build region table from {:?}", path))?;

    Ok(RegionTable {
        table,
        mean_coverage,
    })
}

///
/// Read per-sample mean coverage from a QC table.
///
/// # Arguments
/// - path: QC TSV with a header
/// - sample_col: name of the sample id column (usually `s`)
pub fn read_qc_means(path: &Path, sample_col: &str) -> Result<BTreeMap<String, f64>> {
    let mut reader = open_tsv(path)?;
    let headers = reader.headers()?.clone();
    let sample_idx = header_index(&headers, sample_col, path)?;
    let mean_idx = header_index(&headers, MEAN_COVERAGE_COL, path)?;

    let mut means = BTreeMap::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read {:?}", path))?;
        let sample = record.get(sample_idx).unwrap_or_default();
        let mean = Value::parse(record.get(mean_idx).unwrap_or(""), ElementType::Float64)
            .with_context(|| format!("Invalid mean coverage on row {} in {:?}", line + 2, path))?;
        match mean.and_then(|v| v.as_f64()) {
            Some(mean) => {
                if means.insert(sample.to_string(), mean).is_some() {
                    anyhow::bail!("Sample {} appears more than once in {:?}", sample, path);
                }
            }
            None => warn!("Sample {} has no mean coverage in {:?}", sample, path),
        }
    }

    Ok(means)
}
