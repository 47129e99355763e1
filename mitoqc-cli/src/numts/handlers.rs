use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::ArgMatches;
use log::{info, warn};

use mitoqc_io::consts::TABLE_FILE_EXT;
use mitoqc_io::{RegionTable, read_qc_means, read_region_table, read_table_file};
use mitoqc_stats::{
    BoundsMode, LowTailComparison, NullPopulation, NullStatistic, NumtReport, run_numt_analysis,
    score, write_target_report,
};

use crate::config::PipelineConfig;

/// Where the null population comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum NullSource {
    Table(PathBuf),
    Saved(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct NumtInputs {
    pub targets: PathBuf,
    pub nulls: Option<NullSource>,
    pub qc: Option<(PathBuf, String)>,
}

/// A `.kt` table carries no means; a long TSV may.
fn load_region_input(path: &Path) -> Result<RegionTable> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(TABLE_FILE_EXT) => Ok(RegionTable {
            table: read_table_file(path)?,
            mean_coverage: BTreeMap::new(),
        }),
        _ => read_region_table(path),
    }
}

///
/// Per-sample means, first from the QC table, then from a mean column of
/// the target input. `None` leaves them to be computed from the data.
///
fn sample_means(inputs: &NumtInputs, targets: &RegionTable) -> Result<Option<BTreeMap<String, f64>>> {
    if let Some((path, sample_col)) = &inputs.qc {
        return Ok(Some(read_qc_means(path, sample_col)?));
    }
    if !targets.mean_coverage.is_empty() {
        return Ok(Some(targets.mean_coverage.clone()));
    }
    info!("No mean coverage supplied; using each sample's mean over the target table");
    Ok(None)
}

pub fn numt_analysis(inputs: &NumtInputs, config: &PipelineConfig) -> Result<NumtReport> {
    let params = config.numt_params();
    let targets = load_region_input(&inputs.targets)?;
    let means = sample_means(inputs, &targets)?;

    let report = match (&inputs.nulls, config.numt_only) {
        (Some(_), true) => {
            warn!("Null input ignored in numt-only mode");
            run_numt_analysis(&targets.table, None, means.as_ref(), &params)?
        }
        (None, true) => run_numt_analysis(&targets.table, None, means.as_ref(), &params)?,
        (None, false) => anyhow::bail!("A null table is required unless numt_only is set"),
        (Some(NullSource::Table(path)), false) => {
            let nulls = load_region_input(path)?;
            run_numt_analysis(&targets.table, Some(&nulls.table), means.as_ref(), &params)?
        }
        (Some(NullSource::Saved(path)), false) => {
            let population = NullPopulation::read_from(path)?;
            info!(
                "Loaded {} null tracks from {:?}",
                population.n_tracks(),
                path
            );
            let mut report = run_numt_analysis(&targets.table, None, means.as_ref(), &params)?;
            report.p_values = Some(score(
                &report.stats,
                &population,
                params.null_statistic,
                params.low_tail,
            )?);
            report.population = Some(population);
            report
        }
    };
    Ok(report)
}

fn apply_overrides(matches: &ArgMatches, config: &PipelineConfig) -> PipelineConfig {
    let mut config = config.clone();
    if matches.get_flag("numt-only") {
        config.numt_only = true;
    }
    if let Some(&trim) = matches.get_one::<i64>("trim-bases") {
        config.trim_bases = trim;
    }
    if let Some(&n_pick) = matches.get_one::<u64>("n-pick") {
        config.n_pick = n_pick;
    }
    if let Some(thresholds) = matches.get_many::<f64>("thresholds") {
        config.thresholds = thresholds.copied().collect();
    }
    if let Some(&width) = matches.get_one::<usize>("label-width") {
        config.label_width = width;
    }
    if let Some(mode) = matches.get_one::<String>("bounds-mode") {
        config.bounds_mode = match mode.as_str() {
            "label" => BoundsMode::Label,
            _ => BoundsMode::Derive,
        };
    }
    if let Some(stat) = matches.get_one::<String>("null-statistic") {
        config.null_statistic = match stat.as_str() {
            "occupied_ranks" => NullStatistic::OccupiedRanks,
            "outlier_fraction" => NullStatistic::OutlierFraction,
            _ => NullStatistic::OccupiedCount,
        };
    }
    if let Some(tail) = matches.get_one::<String>("low-tail") {
        config.low_tail_comparison = match tail.as_str() {
            "less" => LowTailComparison::Less,
            _ => LowTailComparison::Greater,
        };
    }
    config
}

pub fn run_numts(matches: &ArgMatches, config: &PipelineConfig) -> Result<()> {
    let config = apply_overrides(matches, config);

    let targets = matches
        .get_one::<String>("targets")
        .expect("targets table is required");
    let output = matches
        .get_one::<String>("output")
        .expect("output path is required");
    let sample_col = matches
        .get_one::<String>("sample-col")
        .expect("sample column has a default");

    let nulls = match (
        matches.get_one::<String>("nulls"),
        matches.get_one::<String>("load-null"),
    ) {
        (Some(path), _) => Some(NullSource::Table(PathBuf::from(path))),
        (None, Some(path)) => Some(NullSource::Saved(PathBuf::from(path))),
        (None, None) => None,
    };

    let inputs = NumtInputs {
        targets: PathBuf::from(targets),
        nulls,
        qc: matches
            .get_one::<String>("qc")
            .map(|qc| (PathBuf::from(qc), sample_col.clone())),
    };

    let report = numt_analysis(&inputs, &config)?;
    let output = Path::new(output);
    write_target_report(output, &report.stats, report.p_values.as_deref())?;
    info!("Wrote {} target rows to {:?}", report.stats.stats.len(), output);

    if let Some(path) = matches.get_one::<String>("save-null") {
        match &report.population {
            Some(population) => population.write_to(path)?,
            None => warn!("No null population to save in numt-only mode"),
        }
    }
    Ok(())
}
