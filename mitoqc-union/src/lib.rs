//! # Chunked union of keyed coverage tables.
//!
//! Merges many single-sample (or few-sample) [mitoqc_core::models::KeyedTable]s
//! into one table whose columns are the union of the inputs' columns. Rows
//! a table never had are filled with nulls of the field's declared type.
//!
//! The merge proceeds in stages: each stage joins consecutive groups of
//! `chunk_size` tables, checkpoints every merged group through a
//! [CheckpointStore], and hands the merged list to the next stage until a
//! single table remains.
//!
//! ```rust,ignore
//! use mitoqc_union::{union, DirCheckpointStore};
//!
//! let store = DirCheckpointStore::new("tmp/union")?;
//! let merged = union(tables, 100, &store)?;
//! ```
pub mod checkpoint;
pub mod join;
pub mod reduce;

pub use checkpoint::*;
pub use join::multi_way_join;
pub use reduce::{reduce_stage, union};
