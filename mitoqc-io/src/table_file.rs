use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};

use mitoqc_core::models::{KeyedTable, RowKeyKind};

use crate::consts::{POS_COL, TARGET_COL};
use crate::tsv::create_tsv;

pub trait TableWrite {
    ///
    /// Write the table to disk in the binary `.kt` format
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    fn write_table_file<T: AsRef<Path>>(&self, path: T) -> Result<()>;

    ///
    /// Write one entry field as a sample-level matrix: `pos` (and `target`
    /// when rows carry one) followed by one column per sample
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    /// - field: entry field to export
    fn write_sample_level<T: AsRef<Path>>(&self, path: T, field: &str) -> Result<()>;
}

impl TableWrite for KeyedTable {
    fn write_table_file<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create table file: {:?}", path))?;
        bincode::serialize_into(BufWriter::new(file), self)
            .with_context(|| format!("Failed to serialize table to: {:?}", path))?;
        Ok(())
    }

    fn write_sample_level<T: AsRef<Path>>(&self, path: T, field: &str) -> Result<()> {
        let path = path.as_ref();
        let field_idx = self.schema().require_field(field)?;
        let with_target = self.schema().key_kind == RowKeyKind::LocusTarget;

        let mut writer = create_tsv(path)?;

        let mut header = vec![POS_COL.to_string()];
        if with_target {
            header.push(TARGET_COL.to_string());
        }
        header.extend(self.col_keys().iter().map(|k| k.to_string()));
        writer.write_record(&header)?;

        for (row_idx, row) in self.rows().iter().enumerate() {
            let mut record = vec![row.pos.to_string()];
            if let Some(target) = row.target() {
                record.push(target.to_string());
            }
            for col_idx in 0..self.n_cols() {
                record.push(self.column_field(col_idx, field_idx).format(row_idx));
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Load a table written by [TableWrite::write_table_file].
pub fn read_table_file<T: AsRef<Path>>(path: T) -> Result<KeyedTable> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open table file: {:?}", path))?;
    let table = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("Failed to deserialize table from: {:?}", path))?;
    Ok(table)
}
