use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::ArgMatches;
use log::info;

use mitoqc_io::consts::SAMPLE_COL;
use mitoqc_samples::{
    ChromSelection, FileKind, SampleTable, collate, compute_nuc_coverage, discover,
    filter_and_annotate, nuc_coverage_table, write_coverage_manifest, write_mapped_read_counts,
};

use super::cli::*;

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .expect("argument is required or has a default")
}

fn run_table(matches: &ArgMatches) -> Result<()> {
    let folders: Vec<PathBuf> = matches
        .get_many::<String>("folder")
        .expect("at least one folder is required")
        .map(PathBuf::from)
        .collect();
    let kinds = matches
        .get_many::<String>("kind")
        .expect("at least one kind is required")
        .map(|k| k.parse::<FileKind>())
        .collect::<Result<Vec<_>>>()?;

    let table = discover(
        &folders,
        &kinds,
        matches.get_flag("recursive"),
        matches.get_flag("enforce-nonmissing"),
    )?;
    table.write_tsv(Path::new(required(matches, "output")))?;
    info!("Listed files for {} samples", table.len());
    Ok(())
}

fn run_collate(matches: &ArgMatches) -> Result<()> {
    let files = SampleTable::read_tsv(Path::new(required(matches, "files")), SAMPLE_COL)?;
    let qc = matches
        .get_one::<String>("qc-files")
        .map(|p| SampleTable::read_tsv(Path::new(p), SAMPLE_COL))
        .transpose()?;
    let qc_col = required(matches, "qc-col");

    let table = collate(
        &files,
        required(matches, "stats-col"),
        qc.as_ref().map(|qc| (qc, qc_col)),
        matches.get_flag("check-ids"),
    )?;
    table.write_tsv(Path::new(required(matches, "output")))?;
    info!("Collated {} samples", table.len());

    if let Some(manifest) = matches.get_one::<String>("coverage-manifest") {
        let n = write_coverage_manifest(&table, required(matches, "coverage-col"), Path::new(manifest))?;
        info!("Wrote coverage manifest for {} samples", n);
    }
    Ok(())
}

fn run_stats(matches: &ArgMatches) -> Result<()> {
    let stats = SampleTable::read_tsv(Path::new(required(matches, "sample-stats")), SAMPLE_COL)?;
    let contamination =
        SampleTable::read_tsv(Path::new(required(matches, "contamination")), SAMPLE_COL)?;
    let filtered = filter_and_annotate(&stats, &contamination)?;
    filtered.write_tsv(Path::new(required(matches, "output")))
}

fn run_nuc_coverage(matches: &ArgMatches) -> Result<()> {
    let inputs = SampleTable::read_tsv(Path::new(required(matches, "input-tsv")), SAMPLE_COL)?;
    let selection = ChromSelection {
        main_only: matches.get_flag("main-chroms"),
        include_mtdna: matches.get_flag("include-mtdna"),
    };

    let results = compute_nuc_coverage(
        &inputs,
        required(matches, "idxstats"),
        required(matches, "read-length"),
        selection,
    )?;
    nuc_coverage_table(&results)?.write_tsv(Path::new(required(matches, "output")))?;

    if let Some(path) = matches.get_one::<String>("mapped-counts") {
        write_mapped_read_counts(Path::new(path), &results)?;
    }
    Ok(())
}

pub fn run_samples(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some((SAMPLES_TABLE, matches)) => run_table(matches),
        Some((SAMPLES_COLLATE, matches)) => run_collate(matches),
        Some((SAMPLES_STATS, matches)) => run_stats(matches),
        Some((SAMPLES_NUC_COVERAGE, matches)) => run_nuc_coverage(matches),
        _ => unreachable!("Samples subcommand not found"),
    }
}
