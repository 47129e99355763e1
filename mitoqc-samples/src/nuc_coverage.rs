use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use log::{info, warn};
use rayon::prelude::*;

use mitoqc_core::models::NULL_TOKEN;
use mitoqc_core::utils::get_dynamic_reader;
use mitoqc_io::consts::CHROM_COL;
use mitoqc_io::tsv::{create_tsv, header_index, open_tsv};

use crate::collate::listing_entries;
use crate::table::SampleTable;

pub const READ_LENGTH_COL: &str = "READ_LENGTH";
pub const TOTAL_MAPPED_READS_COL: &str = "total_mapped_reads";
pub const NUCLEAR_COVERAGE_COL: &str = "nuclear_coverage";
pub const MT_CHROM: &str = "chrM";

/// One line of `samtools idxstats` output.
#[derive(Debug, Clone, PartialEq)]
pub struct IdxStatsRow {
    pub chrom: String,
    pub chrom_len: u64,
    pub mapped_reads: u64,
    pub unmapped_reads: u64,
}

/// Which chromosomes count towards nuclear coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChromSelection {
    /// chr1-chr22, chrX and chrY only
    pub main_only: bool,
    pub include_mtdna: bool,
}

impl ChromSelection {
    pub fn contains(&self, chrom: &str) -> bool {
        if chrom == MT_CHROM {
            return self.include_mtdna;
        }
        if self.main_only {
            return match chrom.strip_prefix("chr") {
                Some("X") | Some("Y") => true,
                Some(n) => n.parse::<u8>().is_ok_and(|n| (1..=22).contains(&n)),
                None => false,
            };
        }
        // `*` holds the unplaced reads
        chrom != "*"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleNucCoverage {
    pub sample: String,
    pub read_length: f64,
    pub total_mapped_reads: u64,
    pub nuclear_coverage: f64,
    pub idxstats: Vec<IdxStatsRow>,
}

/// Read a headerless idxstats file: `chrom chrom_len mapped_reads unmapped_reads`.
pub fn read_idxstats(path: &Path) -> Result<Vec<IdxStatsRow>> {
    let reader = get_dynamic_reader(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read {:?}", path))?;
        if record.len() < 4 {
            anyhow::bail!("Line {} of {:?} has {} columns, expected 4", line + 1, path, record.len());
        }
        let number = |idx: usize| -> Result<u64> {
            record[idx]
                .parse::<u64>()
                .with_context(|| format!("Line {} of {:?}: '{}' is not a count", line + 1, path, &record[idx]))
        };
        rows.push(IdxStatsRow {
            chrom: record[0].to_string(),
            chrom_len: number(1)?,
            mapped_reads: number(2)?,
            unmapped_reads: number(3)?,
        });
    }
    Ok(rows)
}

/// Read length from the first row of a table with a `READ_LENGTH` column.
pub fn read_read_length(path: &Path) -> Result<f64> {
    let mut reader = open_tsv(path)?;
    let headers = reader.headers()?.clone();
    let idx = header_index(&headers, READ_LENGTH_COL, path)?;
    let record = reader
        .records()
        .next()
        .with_context(|| format!("No rows in read length table {:?}", path))?
        .with_context(|| format!("Failed to read {:?}", path))?;
    let raw = record.get(idx).unwrap_or_default();
    raw.parse::<f64>()
        .with_context(|| format!("Invalid {} '{}' in {:?}", READ_LENGTH_COL, raw, path))
}

///
/// `total_mapped_reads * read_length / sum(chrom_len)` over the selected
/// chromosomes.
///
pub fn nuclear_coverage(
    rows: &[IdxStatsRow],
    read_length: f64,
    selection: ChromSelection,
) -> Result<(u64, f64)> {
    let (mapped, length) = rows
        .iter()
        .filter(|r| selection.contains(&r.chrom))
        .fold((0u64, 0u64), |(m, l), r| (m + r.mapped_reads, l + r.chrom_len));
    if length == 0 {
        anyhow::bail!("No chromosome length left after chromosome selection");
    }
    Ok((mapped, mapped as f64 * read_length / length as f64))
}

fn sample_nuc_coverage(
    sample: &str,
    idxstats: &Path,
    read_length: &Path,
    selection: ChromSelection,
) -> Result<SampleNucCoverage> {
    let rows = read_idxstats(idxstats)?;
    let read_length = read_read_length(read_length)?;
    let (total_mapped_reads, nuclear_coverage) = nuclear_coverage(&rows, read_length, selection)
        .with_context(|| format!("Cannot compute nuclear coverage for sample {}", sample))?;
    Ok(SampleNucCoverage {
        sample: sample.to_string(),
        read_length,
        total_mapped_reads,
        nuclear_coverage,
        idxstats: rows,
    })
}

///
/// Nuclear coverage of every sample in `inputs` having both an idxstats and
/// a read length file; samples missing either are skipped.
///
/// # Arguments
/// - inputs: sample table with file path columns
/// - idxstats_col: column holding idxstats paths
/// - read_length_col: column holding read length table paths
/// - selection: chromosomes to count
pub fn compute_nuc_coverage(
    inputs: &SampleTable,
    idxstats_col: &str,
    read_length_col: &str,
    selection: ChromSelection,
) -> Result<Vec<SampleNucCoverage>> {
    let idxstats = listing_entries(inputs, idxstats_col)?;
    let lengths = listing_entries(inputs, read_length_col)?;
    let jobs: Vec<(String, PathBuf, PathBuf)> = idxstats
        .into_iter()
        .filter_map(|(s, idx)| {
            let (_, len) = lengths.iter().find(|(ls, _)| *ls == s)?;
            Some((s, idx, len.clone()))
        })
        .collect();
    let skipped = inputs.len() - jobs.len();
    if skipped > 0 {
        warn!(
            "Skipping {} samples without both {} and {} files",
            skipped, idxstats_col, read_length_col
        );
    }
    if jobs.is_empty() {
        anyhow::bail!("No samples with both {} and {} files", idxstats_col, read_length_col);
    }
    info!("Computing nuclear coverage for {} samples", jobs.len());

    jobs.par_iter()
        .map(|(s, idx, len)| sample_nuc_coverage(s, idx, len, selection))
        .collect()
}

/// Per-sample table: `s READ_LENGTH total_mapped_reads nuclear_coverage`.
pub fn nuc_coverage_table(results: &[SampleNucCoverage]) -> Result<SampleTable> {
    let mut table = SampleTable::new(
        [READ_LENGTH_COL, TOTAL_MAPPED_READS_COL, NUCLEAR_COVERAGE_COL]
            .map(String::from)
            .to_vec(),
    );
    for r in results {
        table.push_row(
            &r.sample,
            vec![
                Some(r.read_length.to_string()),
                Some(r.total_mapped_reads.to_string()),
                Some(r.nuclear_coverage.to_string()),
            ],
        )?;
    }
    Ok(table)
}

///
/// Mapped read counts for every chromosome (rows) and sample (columns),
/// with `chrom` and `chrom_len` leading. Chromosomes follow the order of
/// first appearance; a chromosome absent for a sample is `NA`.
///
pub fn write_mapped_read_counts(path: &Path, results: &[SampleNucCoverage]) -> Result<()> {
    let mut chroms: Vec<(&str, u64)> = Vec::new();
    let mut seen = BTreeSet::new();
    for row in results.iter().flat_map(|r| &r.idxstats) {
        if seen.insert(row.chrom.as_str()) {
            chroms.push((row.chrom.as_str(), row.chrom_len));
        }
    }

    let mut writer = create_tsv(path)?;
    let mut header = vec![CHROM_COL.to_string(), "chrom_len".to_string()];
    header.extend(results.iter().map(|r| r.sample.clone()));
    writer.write_record(&header)?;

    for (chrom, len) in chroms {
        let mut record = vec![chrom.to_string(), len.to_string()];
        record.extend(results.iter().map(|r| {
            r.idxstats
                .iter()
                .find(|row| row.chrom == chrom)
                .map_or_else(|| NULL_TOKEN.to_string(), |row| row.mapped_reads.to_string())
        }));
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write mapped read counts {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::TempDir;

    const IDXSTATS: &str = "chr1\t1000\t300\t0\n\
                            chr2\t1000\t100\t0\n\
                            chrM\t100\t500\t0\n\
                            chrUn_x\t1000\t100\t0\n\
                            *\t0\t0\t50\n";

    #[fixture]
    fn rows() -> Vec<IdxStatsRow> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.idxstats");
        std::fs::write(&path, IDXSTATS).unwrap();
        read_idxstats(&path).unwrap()
    }

    #[rstest]
    #[case("chr7", true, true)]
    #[case("chrX", true, true)]
    #[case("chr23", true, false)]
    #[case("chrUn_x", true, false)]
    #[case("chrUn_x", false, true)]
    #[case("chrM", false, false)]
    #[case("*", false, false)]
    fn test_chrom_selection(#[case] chrom: &str, #[case] main_only: bool, #[case] expected: bool) {
        let selection = ChromSelection {
            main_only,
            include_mtdna: false,
        };
        assert_eq!(selection.contains(chrom), expected);
    }

    #[rstest]
    fn test_nuclear_coverage_selection(rows: Vec<IdxStatsRow>) {
        assert_eq!(rows.len(), 5);

        let main = ChromSelection {
            main_only: true,
            include_mtdna: false,
        };
        assert_eq!(nuclear_coverage(&rows, 100.0, main).unwrap(), (400, 20.0));

        let all = ChromSelection::default();
        assert_eq!(nuclear_coverage(&rows, 150.0, all).unwrap(), (500, 25.0));

        let with_mt = ChromSelection {
            main_only: true,
            include_mtdna: true,
        };
        assert_eq!(nuclear_coverage(&rows, 100.0, with_mt).unwrap().0, 900);
    }

    #[rstest]
    fn test_nuclear_coverage_rejects_empty_selection() {
        let rows = vec![IdxStatsRow {
            chrom: "chrM".to_string(),
            chrom_len: 100,
            mapped_reads: 10,
            unmapped_reads: 0,
        }];
        assert!(nuclear_coverage(&rows, 100.0, ChromSelection::default()).is_err());
    }

    fn inputs(dir: &TempDir) -> SampleTable {
        let mut table = SampleTable::new(vec!["idxstats".to_string(), "read_length".to_string()]);
        for s in ["a", "b"] {
            let idx = dir.path().join(format!("{}.idxstats", s));
            std::fs::write(&idx, IDXSTATS).unwrap();
            let len = dir.path().join(format!("{}.len.tsv", s));
            std::fs::write(&len, "READ_LENGTH\tN\n100\t5\n").unwrap();
            table
                .push_row(
                    s,
                    vec![
                        Some(idx.to_string_lossy().into_owned()),
                        Some(len.to_string_lossy().into_owned()),
                    ],
                )
                .unwrap();
        }
        table
            .push_row("c", vec![Some("c.idxstats".to_string()), None])
            .unwrap();
        table
    }

    #[rstest]
    fn test_compute_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let selection = ChromSelection {
            main_only: true,
            include_mtdna: false,
        };
        let results = compute_nuc_coverage(&inputs(&dir), "idxstats", "read_length", selection).unwrap();
        assert_eq!(results.len(), 2);

        let table = nuc_coverage_table(&results).unwrap();
        assert_eq!(table.get("b", NUCLEAR_COVERAGE_COL), Some("20"));
        assert_eq!(table.get("a", TOTAL_MAPPED_READS_COL), Some("400"));

        let path = dir.path().join("counts.tsv");
        write_mapped_read_counts(&path, &results).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "chrom\tchrom_len\ta\tb");
        assert_eq!(lines[3], "chrM\t100\t500\t500");
        assert_eq!(lines.len(), 6);
    }
}
