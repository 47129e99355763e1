use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{Reader, ReaderBuilder, StringRecord, Writer, WriterBuilder};

use mitoqc_core::utils::{get_dynamic_reader, get_dynamic_writer};

pub type TsvReader = Reader<BufReader<Box<dyn Read>>>;
pub type TsvWriter = Writer<BufWriter<Box<dyn Write>>>;

/// Open a tab-delimited file with a header row; `.gz` is decompressed.
pub fn open_tsv(path: &Path) -> Result<TsvReader> {
    let reader = get_dynamic_reader(path)?;
    Ok(ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader))
}

/// Create a tab-delimited writer; `.gz` is compressed.
pub fn create_tsv(path: &Path) -> Result<TsvWriter> {
    let writer = get_dynamic_writer(path)?;
    Ok(WriterBuilder::new().delimiter(b'\t').from_writer(writer))
}

/// Index of a required header column.
pub fn header_index(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("Column '{}' not found in header of {:?}", name, path))
}

pub fn optional_header_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}
