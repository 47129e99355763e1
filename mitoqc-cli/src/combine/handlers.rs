use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;
use rayon::prelude::*;

use mitoqc_core::models::KeyedTable;
use mitoqc_io::consts::{BATCH_COL, SAMPLE_COL, TABLE_FILE_EXT};
use mitoqc_io::tsv::create_tsv;
use mitoqc_io::{
    CoverageReadOptions, TableWrite, read_coverage_manifest, read_coverage_matrix,
    read_matrix_batches, read_sample_coverage,
};
use mitoqc_stats::{Predicate, RowGroupKey, annotate, write_position_stats};
use mitoqc_union::{DirCheckpointStore, union};

use crate::config::PipelineConfig;
use crate::progress::file_progress;

/// Coverage cut-offs reported for the primary field.
pub const COVERAGE_CUTOFFS: [f64; 2] = [100.0, 1000.0];

#[derive(Debug, Clone, PartialEq)]
pub enum CombineInput {
    Manifest(PathBuf),
    MatrixBatches(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CombineOptions {
    pub output: PathBuf,
    pub temp_dir: PathBuf,
    pub chunk_size: usize,
    pub read: CoverageReadOptions,
    pub overwrite: bool,
    pub binary_only: bool,
}

impl CombineOptions {
    /// Output path without the `.kt` extension; flat outputs are named from it.
    fn stem(&self) -> PathBuf {
        self.output.with_extension("")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.stem().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    pub fn position_stats_path(&self) -> PathBuf {
        self.sibling(".tsv")
    }

    pub fn sample_level_path(&self, field: &str) -> PathBuf {
        self.sibling(&format!("_{}_sample_level.txt", field))
    }

    pub fn sample_batches_path(&self) -> PathBuf {
        self.sibling("_sample_batches.tsv")
    }
}

fn check_output(options: &CombineOptions) -> Result<()> {
    if options.output.extension().and_then(|e| e.to_str()) != Some(TABLE_FILE_EXT) {
        anyhow::bail!(
            "Output {:?} must end with .{}",
            options.output,
            TABLE_FILE_EXT
        );
    }
    if options.output.exists() && !options.overwrite {
        anyhow::bail!(
            "Output {:?} already exists; pass --overwrite to replace it",
            options.output
        );
    }
    Ok(())
}

fn read_manifest_tables(path: &Path, read: &CoverageReadOptions) -> Result<Vec<KeyedTable>> {
    let entries = read_coverage_manifest(path)?;
    info!("Reading {} per-sample coverage files", entries.len());

    let bar = file_progress(entries.len(), "coverage files");
    let tables = entries
        .par_iter()
        .map(|entry| {
            let table = read_sample_coverage(&entry.path, &entry.sample, read)
                .with_context(|| format!("Failed to read coverage for {}", entry.sample))?;
            bar.inc(1);
            Ok(table)
        })
        .collect::<Result<Vec<_>>>()?;
    bar.finish_with_message("coverage files read");
    Ok(tables)
}

/// Matrices of a batch list, and the batch of every sample column.
fn read_batch_tables(
    path: &Path,
    read: &CoverageReadOptions,
) -> Result<(Vec<KeyedTable>, Vec<(String, String)>)> {
    let batches = read_matrix_batches(path)?;
    info!("Reading {} coverage matrices", batches.len());

    let bar = file_progress(batches.len(), "coverage matrices");
    let tables = batches
        .par_iter()
        .map(|b| {
            let table = read_coverage_matrix(&b.path, read.keep_targets)
                .with_context(|| format!("Failed to read matrix for batch {}", b.batch))?;
            bar.inc(1);
            Ok(table)
        })
        .collect::<Result<Vec<_>>>()?;
    bar.finish_with_message("coverage matrices read");

    let sample_batches = batches
        .iter()
        .zip(&tables)
        .flat_map(|(b, t)| t.col_keys().into_iter().map(move |s| (s.to_string(), b.batch.clone())))
        .collect();
    Ok((tables, sample_batches))
}

fn write_sample_batches(path: &Path, sample_batches: &[(String, String)]) -> Result<()> {
    let mut writer = create_tsv(path)?;
    writer.write_record([SAMPLE_COL, BATCH_COL])?;
    for (s, batch) in sample_batches {
        writer.write_record([s, batch])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write sample batches {:?}", path))?;
    Ok(())
}

/// Per-position mean and median of every field, with coverage cut-off
/// proportions for the first one.
fn write_flat_outputs(merged: &KeyedTable, options: &CombineOptions) -> Result<()> {
    let fields = merged.schema().field_names();
    let cutoffs: Vec<Predicate> = COVERAGE_CUTOFFS.iter().map(|&c| Predicate::Above(c)).collect();

    let stats = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let predicates = match i {
                0 => cutoffs.as_slice(),
                _ => &[],
            };
            annotate(merged, field, RowGroupKey::Row, predicates)
        })
        .collect::<mitoqc_core::Result<Vec<_>>>()?;

    let stats_path = options.position_stats_path();
    write_position_stats(&stats_path, merged, &stats)?;
    info!("Wrote per-position annotations to {:?}", stats_path);

    for field in fields {
        merged.write_sample_level(options.sample_level_path(field), field)?;
    }
    Ok(())
}

///
/// Read every input, union the tables in stages checkpointed under
/// `temp_dir`, and write the merged table plus its flat annotations.
///
pub fn combine_coverage(input: &CombineInput, options: &CombineOptions) -> Result<KeyedTable> {
    check_output(options)?;

    let (tables, sample_batches) = match input {
        CombineInput::Manifest(path) => (read_manifest_tables(path, &options.read)?, Vec::new()),
        CombineInput::MatrixBatches(path) => read_batch_tables(path, &options.read)?,
    };

    let store = DirCheckpointStore::new(&options.temp_dir)?;
    let merged = union(tables, options.chunk_size, &store)?;
    info!(
        "Merged table has {} rows and {} samples",
        merged.n_rows(),
        merged.n_cols()
    );

    merged.write_table_file(&options.output)?;
    if !options.binary_only {
        write_flat_outputs(&merged, options)?;
        if !sample_batches.is_empty() {
            write_sample_batches(&options.sample_batches_path(), &sample_batches)?;
        }
    }
    Ok(merged)
}

pub fn run_combine(matches: &ArgMatches, config: &PipelineConfig) -> Result<()> {
    let input = match (
        matches.get_one::<String>("input-tsv"),
        matches.get_one::<String>("matrix-input"),
    ) {
        (Some(path), _) => CombineInput::Manifest(PathBuf::from(path)),
        (None, Some(path)) => CombineInput::MatrixBatches(PathBuf::from(path)),
        (None, None) => anyhow::bail!("One of --input-tsv or --matrix-input is required"),
    };

    let output = matches
        .get_one::<String>("output")
        .expect("output path is required");
    let temp_dir = matches
        .get_one::<String>("temp-dir")
        .expect("temp dir is required");
    let chunk_size = matches
        .get_one::<usize>("chunk-size")
        .copied()
        .unwrap_or(config.chunk_size);

    let options = CombineOptions {
        output: PathBuf::from(output),
        temp_dir: PathBuf::from(temp_dir),
        chunk_size,
        read: CoverageReadOptions {
            keep_targets: matches.get_flag("keep-targets"),
            expect_shifted: matches.get_flag("expect-shifted"),
        },
        overwrite: matches.get_flag("overwrite"),
        binary_only: matches.get_flag("binary-only"),
    };

    combine_coverage(&input, &options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::TempDir;

    use mitoqc_io::read_table_file;

    fn options(dir: &TempDir) -> CombineOptions {
        CombineOptions {
            output: dir.path().join("out").join("merged.kt"),
            temp_dir: dir.path().join("tmp"),
            chunk_size: 2,
            read: CoverageReadOptions::default(),
            overwrite: false,
            binary_only: false,
        }
    }

    #[fixture]
    fn manifest_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = String::from("participant_id\tbase_level_coverage_metrics\tsample\n");
        for (s, cov) in [("s1", 150), ("s2", 1500), ("s3", 50)] {
            std::fs::write(
                dir.path().join(format!("{}.tsv", s)),
                format!(
                    "chrom\tpos\ttarget\tcoverage_original\tcoverage_remapped_self\n\
                     chrM\t1\tT\t{cov}\t{cov}\n\
                     chrM\t2\tT\t{cov}\t{cov}\n"
                ),
            )
            .unwrap();
            manifest.push_str(&format!("p_{s}\t{s}.tsv\t{s}\n"));
        }
        std::fs::write(dir.path().join("manifest.tsv"), manifest).unwrap();
        dir
    }

    #[rstest]
    fn test_combine_from_manifest(manifest_dir: TempDir) {
        let options = options(&manifest_dir);
        let input = CombineInput::Manifest(manifest_dir.path().join("manifest.tsv"));
        let merged = combine_coverage(&input, &options).unwrap();
        assert_eq!(merged.n_cols(), 3);
        assert_eq!(merged.n_rows(), 2);

        assert_eq!(read_table_file(&options.output).unwrap(), merged);

        let stats = std::fs::read_to_string(options.position_stats_path()).unwrap();
        let lines: Vec<&str> = stats.lines().collect();
        assert_eq!(
            lines[0],
            "chrom\tpos\tmean_coverage_original\tmedian_coverage_original\t\
             mean_coverage_remapped_self\tmedian_coverage_remapped_self\tover_100\tover_1000"
        );
        assert_eq!(
            lines[1],
            "chrM\t1\t566.6666666666666\t150\t566.6666666666666\t150\t0.6666666666666666\t0.3333333333333333"
        );
        assert!(options.sample_level_path("coverage_original").exists());
        assert!(!options.sample_batches_path().exists());
    }

    #[rstest]
    fn test_existing_output_needs_overwrite(manifest_dir: TempDir) {
        let mut options = options(&manifest_dir);
        let input = CombineInput::Manifest(manifest_dir.path().join("manifest.tsv"));
        combine_coverage(&input, &options).unwrap();
        assert!(combine_coverage(&input, &options).is_err());

        options.overwrite = true;
        assert!(combine_coverage(&input, &options).is_ok());
    }

    #[rstest]
    fn test_output_must_be_kt(manifest_dir: TempDir) {
        let mut options = options(&manifest_dir);
        options.output = manifest_dir.path().join("merged.ht");
        let input = CombineInput::Manifest(manifest_dir.path().join("manifest.tsv"));
        assert!(combine_coverage(&input, &options).is_err());
    }

    #[rstest]
    fn test_combine_from_matrix_batches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b1.tsv"),
            "chrom\tpos\ts1\ts2\nchrM\t1\t10\t20\nchrM\t2\t11\t21\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("b2.tsv"), "chrom\tpos\ts3\nchrM\t2\t30\n").unwrap();
        std::fs::write(
            dir.path().join("batches.tsv"),
            "batch\tcoverage\nB1\tb1.tsv\nB2\tb2.tsv\n",
        )
        .unwrap();

        let options = options(&dir);
        let input = CombineInput::MatrixBatches(dir.path().join("batches.tsv"));
        let merged = combine_coverage(&input, &options).unwrap();
        assert_eq!(merged.n_cols(), 3);
        assert_eq!(merged.n_rows(), 2);

        assert_eq!(
            std::fs::read_to_string(options.sample_batches_path()).unwrap(),
            "s\tbatch\ns1\tB1\ns2\tB1\ns3\tB2\n"
        );
    }
}
