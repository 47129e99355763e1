use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use mitoqc_core::models::NULL_TOKEN;
use mitoqc_io::consts::SAMPLE_COL;
use mitoqc_io::tsv::{create_tsv, header_index, open_tsv};

///
/// A table of text cells keyed by sample id (`s`). Rows are kept sorted by
/// sample id; a missing cell is `None` and is written as `NA`.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleTable {
    columns: Vec<String>,
    rows: BTreeMap<String, Vec<Option<String>>>,
}

fn parse_cell(cell: &str) -> Option<String> {
    match cell {
        "" | NULL_TOKEN => None,
        other => Some(other.to_string()),
    }
}

impl SampleTable {
    pub fn new(columns: Vec<String>) -> Self {
        SampleTable {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .with_context(|| format!("Sample table has no column '{}'", name))
    }

    pub fn sample_ids(&self) -> impl Iterator<Item = &String> {
        self.rows.keys()
    }

    pub fn contains(&self, sample: &str) -> bool {
        self.rows.contains_key(sample)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&String, &Vec<Option<String>>)> {
        self.rows.iter()
    }

    pub fn get(&self, sample: &str, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(sample)?[idx].as_deref()
    }

    /// Insert one row; a repeated sample id is an error.
    pub fn push_row(&mut self, sample: &str, values: Vec<Option<String>>) -> Result<()> {
        if values.len() != self.columns.len() {
            anyhow::bail!(
                "Row for sample {} has {} values, table has {} columns",
                sample,
                values.len(),
                self.columns.len()
            );
        }
        if self.rows.insert(sample.to_string(), values).is_some() {
            anyhow::bail!("Duplicate sample id: {}", sample);
        }
        Ok(())
    }

    /// Keep the rows for which `keep` is true.
    pub fn retain<F: FnMut(&str, &[Option<String>]) -> bool>(&mut self, mut keep: F) {
        self.rows.retain(|s, values| keep(s, values));
    }

    /// Append a column; `values` follow the sample id order of [Self::rows].
    pub fn push_column(&mut self, name: &str, values: Vec<Option<String>>) -> Result<()> {
        if self.column_index(name).is_some() {
            anyhow::bail!("Column '{}' already exists", name);
        }
        if values.len() != self.rows.len() {
            anyhow::bail!(
                "Column '{}' has {} values for {} samples",
                name,
                values.len(),
                self.rows.len()
            );
        }
        for (row, value) in self.rows.values_mut().zip(values) {
            row.push(value);
        }
        self.columns.push(name.to_string());
        Ok(())
    }

    /// True when any cell of the table is missing.
    pub fn has_missing(&self) -> bool {
        self.rows.values().any(|v| v.iter().any(Option::is_none))
    }

    fn check_disjoint_columns(&self, other: &SampleTable) -> Result<()> {
        if let Some(shared) = other.columns.iter().find(|c| self.column_index(c).is_some()) {
            anyhow::bail!("Column '{}' appears in both tables being merged", shared);
        }
        Ok(())
    }

    ///
    /// Outer merge on sample id: every sample of either table is kept and
    /// cells absent on one side are missing. Columns other than `s` must be
    /// disjoint.
    ///
    pub fn outer_merge(&self, other: &SampleTable) -> Result<SampleTable> {
        self.check_disjoint_columns(other)?;
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        let mut rows = BTreeMap::new();
        for s in self.rows.keys().chain(other.rows.keys()) {
            if rows.contains_key(s) {
                continue;
            }
            let mut values = match self.rows.get(s) {
                Some(v) => v.clone(),
                None => vec![None; self.columns.len()],
            };
            match other.rows.get(s) {
                Some(v) => values.extend(v.iter().cloned()),
                None => values.extend(std::iter::repeat_n(None, other.columns.len())),
            }
            rows.insert(s.clone(), values);
        }
        Ok(SampleTable { columns, rows })
    }

    /// Inner merge on sample id: only samples present in both tables.
    pub fn inner_merge(&self, other: &SampleTable) -> Result<SampleTable> {
        self.check_disjoint_columns(other)?;
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        let rows = self
            .rows
            .iter()
            .filter_map(|(s, left)| {
                let right = other.rows.get(s)?;
                let mut values = left.clone();
                values.extend(right.iter().cloned());
                Some((s.clone(), values))
            })
            .collect();
        Ok(SampleTable { columns, rows })
    }

    ///
    /// Stack tables row-wise. Columns are the union in order of first
    /// appearance; a sample present in two tables is an error.
    ///
    pub fn concat(tables: Vec<SampleTable>) -> Result<SampleTable> {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for c in &table.columns {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let mut out = SampleTable::new(columns);
        for table in tables {
            let mapping: Vec<Option<usize>> = out
                .columns
                .iter()
                .map(|c| table.column_index(c))
                .collect();
            for (s, values) in table.rows {
                let row = mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| values[i].clone()))
                    .collect();
                out.push_row(&s, row)?;
            }
        }
        Ok(out)
    }

    ///
    /// Read a TSV with a header row; the `id_col` column becomes the sample
    /// id and every other column is kept as text. Empty cells and `NA` are
    /// missing.
    ///
    pub fn read_tsv(path: &Path, id_col: &str) -> Result<SampleTable> {
        let mut reader = open_tsv(path)?;
        let headers = reader.headers()?.clone();
        let id_idx = header_index(&headers, id_col, path)?;
        let columns = headers
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != id_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut table = SampleTable::new(columns);
        for result in reader.records() {
            let record = result.with_context(|| format!("Failed to read {:?}", path))?;
            let sample = record.get(id_idx).unwrap_or_default();
            if sample.is_empty() {
                anyhow::bail!("Row with empty '{}' in {:?}", id_col, path);
            }
            let values = (0..headers.len())
                .filter(|&i| i != id_idx)
                .map(|i| record.get(i).and_then(parse_cell))
                .collect();
            table
                .push_row(sample, values)
                .with_context(|| format!("Invalid sample table {:?}", path))?;
        }
        Ok(table)
    }

    /// Write the table with `s` as the first column.
    pub fn write_tsv(&self, path: &Path) -> Result<()> {
        let mut writer = create_tsv(path)?;
        let mut header = vec![SAMPLE_COL.to_string()];
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for (s, values) in &self.rows {
            let mut record = vec![s.as_str()];
            record.extend(values.iter().map(|v| v.as_deref().unwrap_or(NULL_TOKEN)));
            writer.write_record(&record)?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write sample table {:?}", path))?;
        Ok(())
    }
}
