//! Coverage statistics and NUMT outlier analysis.
//!
//! This crate turns merged coverage tables into per-position summaries and
//! per-target outlier calls:
//!
//! - [annotate]: mean, median and predicate proportions per row or per target
//! - [bounds]: per-target windows, trimmed, and row pruning
//! - [poisson]: exact Poisson outlier flags at several significance levels
//! - [targets]: flagged-position counts per (target, sample)
//! - [nulls]: null populations and empirical p-values
//! - [report]: TSV writers for the above
//!
//! # Example
//!
//! ```no_run
//! use mitoqc_io::read_region_table;
//! use mitoqc_stats::{NumtAnalysisParams, run_numt_analysis, write_target_report};
//!
//! let targets = read_region_table("numts.tsv".as_ref()).unwrap();
//! let nulls = read_region_table("nulls.tsv".as_ref()).unwrap();
//! let report = run_numt_analysis(
//!     &targets.table,
//!     Some(&nulls.table),
//!     Some(&targets.mean_coverage),
//!     &NumtAnalysisParams::default(),
//! )
//! .unwrap();
//! write_target_report("out.tsv".as_ref(), &report.stats, report.p_values.as_deref()).unwrap();
//! ```

pub mod annotate;
pub mod bounds;
pub mod nulls;
pub mod pipeline;
pub mod poisson;
pub mod report;
pub mod targets;

// re-exports
pub use annotate::{GroupedStats, Predicate, RowGroupKey, annotate};
pub use bounds::{BoundsMode, TargetBoundsProvider, bounds_provider, prune};
pub use nulls::{LowTailComparison, NullPopulation, NullStatistic, build_null, score};
pub use pipeline::{NumtAnalysisParams, NumtReport, run_numt_analysis};
pub use poisson::{ClassifiedTable, DEFAULT_THRESHOLDS, classify};
pub use report::{write_position_stats, write_target_report};
pub use targets::{TargetStats, per_target_stats};
