//! # Input/Output for mitochondrial coverage tables.
//!
//! Readers for the flat files the pipeline consumes (per-sample coverage
//! TSVs, wide coverage matrices, long region tables, QC tables and input
//! manifests), writers for sample-level matrices, and the binary `.kt`
//! table format used for outputs and union checkpoints.
//!
pub mod consts;
pub mod coverage;
pub mod regions;
pub mod table_file;
pub mod tsv;

// re-expose core functions
pub use consts::*;
pub use coverage::*;
pub use regions::*;
pub use table_file::*;
