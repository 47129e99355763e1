//! # Per-sample metadata for mitochondrial QC runs.
//!
//! Sample tables are text tables keyed by sample id. This crate discovers
//! per-sample pipeline outputs on disk, collates stats and QC files into one
//! table, filters samples by contamination and overlap calls, and estimates
//! nuclear coverage from idxstats.
//!
//! ```no_run
//! use std::path::PathBuf;
//! use mitoqc_samples::{FileKind, collate, discover};
//!
//! let kinds: Vec<FileKind> = vec![
//!     "stats=_mtanalysis_diagnostic_statistics.tsv".parse().unwrap(),
//!     "coverage=_per_base_coverage.tsv".parse().unwrap(),
//! ];
//! let files = discover(&[PathBuf::from("runs/")], &kinds, true, true).unwrap();
//! let table = collate(&files, "stats", None, true).unwrap();
//! ```
pub mod collate;
pub mod discover;
pub mod nuc_coverage;
pub mod stats;
pub mod table;

pub use collate::{collate, concat_keyvalue, concat_stats, write_coverage_manifest};
pub use discover::{FileKind, discover, find_files};
pub use nuc_coverage::{
    ChromSelection, SampleNucCoverage, compute_nuc_coverage, nuc_coverage_table,
    write_mapped_read_counts,
};
pub use stats::filter_and_annotate;
pub use table::SampleTable;
