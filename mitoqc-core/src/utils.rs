use std::ffi::OsStr;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Get a writer for a plain or gzip'd file, decided by a `.gz` extension.
/// Parent directories are created as needed.
///
pub fn get_dynamic_writer(path: &Path) -> Result<BufWriter<Box<dyn Write>>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::create(path).with_context(|| format!("Failed to create file: {:?}", path))?;
    let file: Box<dyn Write> = match is_gzipped {
        true => Box::new(GzEncoder::new(file, Compression::default())),
        false => Box::new(file),
    };

    Ok(BufWriter::new(file))
}

///
/// File name of `path` with `suffix` removed, e.g. a sample id from
/// `sample1.stats.tsv` and suffix `.stats.tsv`. Falls back to the file
/// stem when the name does not end with the suffix.
///
pub fn basename_without_suffix(path: &Path, suffix: &str) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    match name.strip_suffix(suffix) {
        Some(stripped) if !stripped.is_empty() => Some(stripped.to_string()),
        _ => Some(remove_all_extensions(path)),
    }
}

pub fn remove_all_extensions(path: &Path) -> String {
    let mut current = path.to_path_buf();
    while current.extension().is_some() {
        current = current.with_extension("");
    }
    current
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
