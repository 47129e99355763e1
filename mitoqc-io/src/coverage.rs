use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::StringRecord;

use mitoqc_core::models::{
    ColumnData, ElementType, FieldSpec, KeyedTable, RowKey, RowKeyKind, SampleColumn, Schema,
    Value,
};

use crate::consts::*;
use crate::tsv::{header_index, open_tsv, optional_header_index};

///
/// How per-sample coverage files are turned into tables: whether rows keep
/// their target label and whether the shifted remapped coverage column is
/// expected.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageReadOptions {
    pub keep_targets: bool,
    pub expect_shifted: bool,
}

impl CoverageReadOptions {
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = vec![COVERAGE_ORIGINAL, COVERAGE_REMAPPED_SELF];
        if self.expect_shifted {
            fields.push(COVERAGE_REMAPPED_SELF_SHIFTED);
        }
        fields
    }

    pub fn key_kind(&self) -> RowKeyKind {
        match self.keep_targets {
            true => RowKeyKind::LocusTarget,
            false => RowKeyKind::Locus,
        }
    }

    pub fn schema(&self) -> Schema {
        Schema::new(
            self.key_kind(),
            self.fields()
                .into_iter()
                .map(|f| FieldSpec::new(f, ElementType::Int32))
                .collect(),
        )
    }
}

/// One row of a coverage input manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageManifestEntry {
    pub participant_id: String,
    pub path: PathBuf,
    pub sample: String,
}

/// One wide coverage matrix and the batch it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixBatch {
    pub batch: String,
    pub path: PathBuf,
}

fn resolve_manifest_path(path: &Path, manifest_dir: &Path) -> PathBuf {
    if path.is_absolute() || path.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        manifest_dir.join(path)
    }
}

pub(crate) fn parse_row_key(
    record: &StringRecord,
    chrom_idx: usize,
    pos_idx: usize,
    target_idx: Option<usize>,
) -> Result<RowKey> {
    let chrom = record.get(chrom_idx).context("Missing chrom")?;
    let pos = record
        .get(pos_idx)
        .context("Missing pos")?
        .trim()
        .parse::<i32>()
        .context("Invalid pos")?;

    match target_idx {
        Some(idx) => {
            let target = record.get(idx).context("Missing target")?;
            Ok(RowKey::with_target(chrom, pos, target))
        }
        None => Ok(RowKey::locus(chrom, pos)),
    }
}

///
/// Read one per-sample coverage TSV into a single-column table.
///
/// # Arguments
/// - path: coverage file, optionally gzipped
/// - sample: sample id used as the column key
/// - options: key kind and expected coverage fields
pub fn read_sample_coverage(
    path: &Path,
    sample: &str,
    options: &CoverageReadOptions,
) -> Result<KeyedTable> {
    let mut reader = open_tsv(path)?;
    let headers = reader.headers()?.clone();

    let chrom_idx = header_index(&headers, CHROM_COL, path)?;
    let pos_idx = header_index(&headers, POS_COL, path)?;
    let target_idx = match options.keep_targets {
        true => Some(header_index(&headers, TARGET_COL, path)?),
        false => None,
    };
    let field_idx = options
        .fields()
        .iter()
        .map(|f| header_index(&headers, f, path))
        .collect::<Result<Vec<usize>>>()?;

    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read {:?}", path))?;
        let key = parse_row_key(&record, chrom_idx, pos_idx, target_idx)
            .with_context(|| format!("Invalid row {} in {:?}", line + 2, path))?;
        let values = field_idx
            .iter()
            .map(|&i| Value::parse(record.get(i).unwrap_or(""), ElementType::Int32))
            .collect::<mitoqc_core::Result<Vec<_>>>()
            .with_context(|| format!("Invalid coverage on row {} in {:?}", line + 2, path))?;
        records.push((key, values));
    }

    let table = KeyedTable::from_sample_records(options.schema(), sample, records)
        .with_context(|| format!("Failed to build coverage table from {:?}", path))?;
    Ok(table)
}

///
/// Read a wide coverage matrix (`chrom pos target <s1> <s2> ...`) into a
/// table with one `coverage` field per sample.
///
pub fn read_coverage_matrix(path: &Path, keep_targets: bool) -> Result<KeyedTable> {
    let mut reader = open_tsv(path)?;
    let headers = reader.headers()?.clone();

    let chrom_idx = header_index(&headers, CHROM_COL, path)?;
    let pos_idx = header_index(&headers, POS_COL, path)?;
    let target_col = optional_header_index(&headers, TARGET_COL);
    let target_idx = match keep_targets {
        true => Some(target_col.with_context(|| {
            format!("Column '{}' required to keep targets in {:?}", TARGET_COL, path)
        })?),
        false => None,
    };

    let sample_idx: Vec<usize> = (0..headers.len())
        .filter(|&i| i != chrom_idx && i != pos_idx && Some(i) != target_col)
        .collect();
    if sample_idx.is_empty() {
        anyhow::bail!("No sample columns found in coverage matrix {:?}", path);
    }

    let mut rows = Vec::new();
    let mut values: Vec<Vec<Option<i32>>> = vec![Vec::new(); sample_idx.len()];
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read {:?}", path))?;
        rows.push(
            parse_row_key(&record, chrom_idx, pos_idx, target_idx)
                .with_context(|| format!("Invalid row {} in {:?}", line + 2, path))?,
        );
        for (column, &i) in values.iter_mut().zip(&sample_idx) {
            let value = Value::parse(record.get(i).unwrap_or(""), ElementType::Int32)
                .with_context(|| format!("Invalid coverage on row {} in {:?}", line + 2, path))?;
            column.push(value.and_then(|v| match v {
                Value::Int32(x) => Some(x),
                _ => None,
            }));
        }
    }

    let key_kind = match keep_targets {
        true => RowKeyKind::LocusTarget,
        false => RowKeyKind::Locus,
    };
    let schema = Schema::new(
        key_kind,
        vec![FieldSpec::new(COVERAGE_FIELD, ElementType::Int32)],
    );
    let cols = sample_idx
        .iter()
        .zip(values)
        .map(|(&i, column)| SampleColumn {
            key: headers[i].to_string(),
            fields: vec![ColumnData::Int32(column)],
        })
        .collect();

    let table = KeyedTable::new(schema, rows, cols)
        .with_context(|| format!("Failed to build coverage table from {:?}", path))?;
    Ok(table)
}

///
/// Read a coverage manifest. The first three columns are the participant
/// id, the coverage file path and the sample id; relative paths are
/// resolved against the manifest's directory.
///
pub fn read_coverage_manifest(path: &Path) -> Result<Vec<CoverageManifestEntry>> {
    let mut reader = open_tsv(path)?;
    let manifest_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut entries = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read manifest {:?}", path))?;
        if record.len() < 3 {
            anyhow::bail!(
                "Manifest row {} in {:?} has {} columns; expected {}, {} and {}",
                line + 2,
                path,
                record.len(),
                MANIFEST_PARTICIPANT_COL,
                MANIFEST_PATH_COL,
                MANIFEST_SAMPLE_COL
            );
        }
        entries.push(CoverageManifestEntry {
            participant_id: record[0].to_string(),
            path: resolve_manifest_path(Path::new(&record[1]), manifest_dir),
            sample: record[2].to_string(),
        });
    }

    if entries.is_empty() {
        anyhow::bail!("No samples found in manifest file {:?}", path);
    }
    Ok(entries)
}

/// Read a list of wide coverage matrices with `batch` and `coverage` columns.
pub fn read_matrix_batches(path: &Path) -> Result<Vec<MatrixBatch>> {
    let mut reader = open_tsv(path)?;
    let headers = reader.headers()?.clone();
    let batch_idx = header_index(&headers, BATCH_COL, path)?;
    let path_idx = header_index(&headers, BATCH_PATH_COL, path)?;
    let manifest_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut batches = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to read batch list {:?}", path))?;
        batches.push(MatrixBatch {
            batch: record.get(batch_idx).unwrap_or_default().to_string(),
            path: resolve_manifest_path(
                Path::new(record.get(path_idx).unwrap_or_default()),
                manifest_dir,
            ),
        });
    }

    if batches.is_empty() {
        anyhow::bail!("No coverage matrices found in batch list {:?}", path);
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[rstest]
    fn test_read_sample_coverage_drops_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "s1.tsv",
            "chrom\tpos\ttarget\tcoverage_original\tcoverage_remapped_self\n\
             chrM\t2\tT\t20\t21\n\
             chrM\t1\tT\t10\tNA\n",
        );

        let table = read_sample_coverage(&path, "s1", &CoverageReadOptions::default()).unwrap();
        assert_eq!(table.schema().key_kind, RowKeyKind::Locus);
        assert_eq!(table.col_keys(), vec!["s1"]);
        assert_eq!(
            table.get(&RowKey::locus("chrM", 1), "s1", COVERAGE_ORIGINAL),
            Some(Value::Int32(10))
        );
        assert_eq!(
            table.get(&RowKey::locus("chrM", 1), "s1", COVERAGE_REMAPPED_SELF),
            None
        );
    }

    #[rstest]
    fn test_read_sample_coverage_requires_shifted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "s1.tsv",
            "chrom\tpos\tcoverage_original\tcoverage_remapped_self\nchrM\t1\t1\t1\n",
        );
        let options = CoverageReadOptions {
            keep_targets: false,
            expect_shifted: true,
        };
        assert!(read_sample_coverage(&path, "s1", &options).is_err());
    }

    #[rstest]
    fn test_read_coverage_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "batch.tsv",
            "chrom\tpos\ttarget\ta\tb\nchrM\t1\tT\t5\t6\nchrM\t2\tT\t7\t\n",
        );

        let table = read_coverage_matrix(&path, true).unwrap();
        assert_eq!(table.col_keys(), vec!["a", "b"]);
        assert_eq!(
            table.get(&RowKey::with_target("chrM", 2, "T"), "a", COVERAGE_FIELD),
            Some(Value::Int32(7))
        );
        assert_eq!(
            table.get(&RowKey::with_target("chrM", 2, "T"), "b", COVERAGE_FIELD),
            None
        );
    }

    #[rstest]
    fn test_read_manifest_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "manifest.tsv",
            "participant_id\tbase_level_coverage_metrics\tsample\np1\tcov/s1.tsv\ts1\n",
        );
        let entries = read_coverage_manifest(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, dir.path().join("cov/s1.tsv"));
        assert_eq!(entries[0].sample, "s1");
    }

    #[rstest]
    fn test_read_empty_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "manifest.tsv",
            "participant_id\tbase_level_coverage_metrics\tsample\n",
        );
        assert!(read_coverage_manifest(&path).is_err());
    }
}
