use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use log::{info, warn};
use rayon::prelude::*;

use mitoqc_core::models::NULL_TOKEN;
use mitoqc_core::utils::get_dynamic_reader;
use mitoqc_io::consts::{
    MANIFEST_PARTICIPANT_COL, MANIFEST_PATH_COL, MANIFEST_SAMPLE_COL, SAMPLE_COL,
};
use mitoqc_io::tsv::create_tsv;

use crate::table::SampleTable;

/// A per-sample stats TSV: header row, one row per sample, sample id in `s`.
pub fn read_stats_file(path: &Path) -> Result<SampleTable> {
    SampleTable::read_tsv(path, SAMPLE_COL)
}

///
/// A headerless `key<TAB>value` file describing one sample, turned into a
/// single row tagged with `sample`.
///
pub fn read_keyvalue_file(path: &Path, sample: &str) -> Result<SampleTable> {
    let reader = get_dynamic_reader(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read {:?}", path))?;
        let (Some(key), Some(value)) = (record.get(0), record.get(1)) else {
            anyhow::bail!("Line {} of {:?} is not a key/value pair", line + 1, path);
        };
        if key == SAMPLE_COL || columns.iter().any(|c| c == key) {
            anyhow::bail!("Key '{}' repeated or reserved in {:?}", key, path);
        }
        columns.push(key.to_string());
        values.push(match value {
            "" | NULL_TOKEN => None,
            v => Some(v.to_string()),
        });
    }

    let mut table = SampleTable::new(columns);
    table.push_row(sample, values)?;
    Ok(table)
}

fn check_same_ids(requested: &[(String, PathBuf)], read: &SampleTable) -> Result<()> {
    let requested: BTreeSet<&str> = requested.iter().map(|(s, _)| s.as_str()).collect();
    let found: BTreeSet<&str> = read.sample_ids().map(String::as_str).collect();
    if requested != found {
        let missing: Vec<&str> = requested.difference(&found).copied().collect();
        let extra: Vec<&str> = found.difference(&requested).copied().collect();
        anyhow::bail!(
            "Sample ids read do not match the ids requested (missing: [{}], unexpected: [{}])",
            missing.join(", "),
            extra.join(", ")
        );
    }
    Ok(())
}

///
/// Read and stack per-sample stats files in parallel. With `check_ids`, the
/// ids found inside the files must be exactly the ids of `entries`.
///
pub fn concat_stats(entries: &[(String, PathBuf)], check_ids: bool) -> Result<SampleTable> {
    let tables = entries
        .par_iter()
        .map(|(_, path)| read_stats_file(path))
        .collect::<Result<Vec<_>>>()?;
    let table = SampleTable::concat(tables)?;
    if check_ids {
        check_same_ids(entries, &table)?;
    }
    Ok(table)
}

///
/// Read and stack key/value QC files in parallel, skipping samples not in
/// `keep` when it is given.
///
pub fn concat_keyvalue(
    entries: &[(String, PathBuf)],
    keep: Option<&BTreeSet<String>>,
) -> Result<SampleTable> {
    let tables = entries
        .par_iter()
        .filter(|(s, _)| keep.is_none_or(|k| k.contains(s)))
        .map(|(s, path)| read_keyvalue_file(path, s))
        .collect::<Result<Vec<_>>>()?;
    SampleTable::concat(tables)
}

/// `(sample, path)` pairs of a listing column, skipping samples without a file.
pub fn listing_entries(listing: &SampleTable, column: &str) -> Result<Vec<(String, PathBuf)>> {
    let idx = listing.require_column(column)?;
    Ok(listing
        .rows()
        .filter_map(|(s, values)| Some((s.clone(), PathBuf::from(values[idx].as_deref()?))))
        .collect())
}

///
/// Build the per-sample analysis table: stack the stats files of `files`,
/// outer-merge the QC files of the samples found there, and keep the
/// samples that have a row in `files`, with their file columns attached.
///
/// # Arguments
/// - files: sample file listing, e.g. from [crate::discover::discover]
/// - stats_col: column of `files` holding stats TSV paths
/// - qc: optional QC listing and the column of its key/value file paths
/// - check_ids: require the stats files to hold exactly the listed samples
pub fn collate(
    files: &SampleTable,
    stats_col: &str,
    qc: Option<(&SampleTable, &str)>,
    check_ids: bool,
) -> Result<SampleTable> {
    let stats_entries = listing_entries(files, stats_col)?;
    let stats = concat_stats(&stats_entries, check_ids)?;
    info!("Read stats for {} samples", stats.len());

    let merged = match qc {
        Some((qc_listing, qc_col)) => {
            let keep: BTreeSet<String> = stats.sample_ids().cloned().collect();
            let qc = concat_keyvalue(&listing_entries(qc_listing, qc_col)?, Some(&keep))?;
            if qc.len() < keep.len() {
                warn!("QC metrics found for {} of {} samples", qc.len(), keep.len());
            }
            stats.outer_merge(&qc)?
        }
        None => stats,
    };
    merged.inner_merge(files)
}

///
/// Write a coverage manifest for `mitoqc combine` from a sample table:
/// `participant_id`, `base_level_coverage_metrics`, `sample`, one row per
/// sample with a coverage path in `coverage_col`.
///
pub fn write_coverage_manifest(table: &SampleTable, coverage_col: &str, path: &Path) -> Result<usize> {
    let entries = listing_entries(table, coverage_col)?;
    let mut writer = create_tsv(path)?;
    writer.write_record([MANIFEST_PARTICIPANT_COL, MANIFEST_PATH_COL, MANIFEST_SAMPLE_COL])?;
    for (s, coverage) in &entries {
        let coverage = coverage.to_string_lossy();
        writer.write_record([s.as_str(), coverage.as_ref(), s.as_str()])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write coverage manifest {:?}", path))?;
    Ok(entries.len())
}
