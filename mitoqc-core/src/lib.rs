//! # Core data model for mitochondrial coverage QC.
//!
//! Holds the [models::KeyedTable] (rows keyed by locus or locus and target,
//! one column per sample, typed entry fields with typed nulls), the crate-wide
//! [errors::MitoQcError] and a few file helpers shared by the other crates.
//!
pub mod errors;
pub mod models;
pub mod utils;

pub use errors::{ErrorKind, MitoQcError, Result};
