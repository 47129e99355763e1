use std::collections::BTreeMap;

use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::errors::{MitoQcError, Result};
use crate::models::row_key::{RowKey, RowKeyKind};
use crate::models::value::{ColumnData, ElementType, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub element_type: ElementType,
}

impl FieldSpec {
    pub fn new(name: &str, element_type: ElementType) -> Self {
        FieldSpec {
            name: name.to_string(),
            element_type,
        }
    }
}

///
/// Schema of a [KeyedTable]: the row key kind plus the ordered entry fields
/// every (row, sample) pair carries.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub key_kind: RowKeyKind,
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(key_kind: RowKeyKind, fields: Vec<FieldSpec>) -> Self {
        Schema { key_kind, fields }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn require_field(&self, name: &str) -> Result<usize> {
        self.field_index(name)
            .ok_or_else(|| MitoQcError::MissingField(name.to_string()))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// All entry fields of one sample, each aligned with the table's rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleColumn {
    pub key: String,
    pub fields: Vec<ColumnData>,
}

///
/// KeyedTable struct: an immutable rows-by-samples table.
///
/// Rows are kept strictly ascending by [RowKey], sample keys are unique, and
/// every (row, sample) pair has exactly one entry per field, possibly a typed
/// null. All operations return new tables.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedTable {
    schema: Schema,
    rows: Vec<RowKey>,
    cols: Vec<SampleColumn>,
}

impl KeyedTable {
    ///
    /// Build a table, validating the schema and sorting rows if needed.
    ///
    /// # Arguments
    /// - schema: row key kind and entry fields
    /// - rows: row keys, in any order, without duplicates
    /// - cols: one [SampleColumn] per sample, aligned with `rows`
    pub fn new(schema: Schema, rows: Vec<RowKey>, cols: Vec<SampleColumn>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.kind() != schema.key_kind) {
            return Err(MitoQcError::SchemaMismatch(format!(
                "Row {} does not match row key kind {:?}",
                row, schema.key_kind
            )));
        }

        {
            let mut seen: FxHashSet<&str> = FxHashSet::default();
            for col in &cols {
                if !seen.insert(col.key.as_str()) {
                    return Err(MitoQcError::DuplicateKey(format!("column {}", col.key)));
                }
                if col.fields.len() != schema.fields.len() {
                    return Err(MitoQcError::SchemaMismatch(format!(
                        "Column {} has {} fields, schema declares {}",
                        col.key,
                        col.fields.len(),
                        schema.fields.len()
                    )));
                }
                for (data, spec) in col.fields.iter().zip(&schema.fields) {
                    if data.element_type() != spec.element_type {
                        return Err(MitoQcError::SchemaMismatch(format!(
                            "Field {} of column {} is {}, schema declares {}",
                            spec.name,
                            col.key,
                            data.element_type(),
                            spec.element_type
                        )));
                    }
                    if data.len() != rows.len() {
                        return Err(MitoQcError::SchemaMismatch(format!(
                            "Field {} of column {} has {} entries for {} rows",
                            spec.name,
                            col.key,
                            data.len(),
                            rows.len()
                        )));
                    }
                }
            }
        }

        if rows.windows(2).all(|w| w[0] < w[1]) {
            return Ok(KeyedTable { schema, rows, cols });
        }

        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| rows[a].cmp(&rows[b]));
        if let Some(w) = order.windows(2).find(|w| rows[w[0]] == rows[w[1]]) {
            return Err(MitoQcError::DuplicateKey(format!("row {}", rows[w[0]])));
        }

        let sorted_rows = order.iter().map(|&i| rows[i].clone()).collect();
        let sorted_cols = cols
            .into_iter()
            .map(|col| SampleColumn {
                key: col.key,
                fields: col.fields.iter().map(|data| data.select(&order)).collect(),
            })
            .collect();

        Ok(KeyedTable {
            schema,
            rows: sorted_rows,
            cols: sorted_cols,
        })
    }

    pub fn empty(schema: Schema) -> Self {
        KeyedTable {
            schema,
            rows: vec![],
            cols: vec![],
        }
    }

    ///
    /// Build a single-sample table from parsed records, as produced when
    /// ingesting one per-sample coverage file.
    ///
    pub fn from_sample_records(
        schema: Schema,
        sample: &str,
        records: Vec<(RowKey, Vec<Option<Value>>)>,
    ) -> Result<Self> {
        let mut fields: Vec<ColumnData> = schema
            .fields
            .iter()
            .map(|f| ColumnData::with_capacity(f.element_type, records.len()))
            .collect();
        let mut rows = Vec::with_capacity(records.len());

        for (key, values) in records {
            if values.len() != fields.len() {
                return Err(MitoQcError::SchemaMismatch(format!(
                    "Row {} has {} values, schema declares {}",
                    key,
                    values.len(),
                    fields.len()
                )));
            }
            for (column, value) in fields.iter_mut().zip(values) {
                column.push(value)?;
            }
            rows.push(key);
        }

        KeyedTable::new(
            schema,
            rows,
            vec![SampleColumn {
                key: sample.to_string(),
                fields,
            }],
        )
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[RowKey] {
        &self.rows
    }

    pub fn cols(&self) -> &[SampleColumn] {
        &self.cols
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn col_keys(&self) -> Vec<&str> {
        self.cols.iter().map(|c| c.key.as_str()).collect()
    }

    pub fn col_index(&self, key: &str) -> Option<usize> {
        self.cols.iter().position(|c| c.key == key)
    }

    pub fn row_index(&self, key: &RowKey) -> Option<usize> {
        self.rows.binary_search(key).ok()
    }

    /// Values of one field for one sample, aligned with [KeyedTable::rows].
    pub fn column_field(&self, col: usize, field: usize) -> &ColumnData {
        &self.cols[col].fields[field]
    }

    pub fn entry(&self, row: usize, col: usize, field: usize) -> Option<Value> {
        self.cols[col].fields[field].get(row)
    }

    ///
    /// Look up one entry by keys. Returns `None` both for a null entry and
    /// for a row or sample the table does not have.
    ///
    pub fn get(&self, row: &RowKey, col: &str, field: &str) -> Option<Value> {
        let field = self.schema.field_index(field)?;
        let row = self.row_index(row)?;
        let col = self.col_index(col)?;
        self.entry(row, col, field)
    }

    ///
    /// New table with one more entry field.
    ///
    /// # Arguments
    /// - spec: name and element type of the new field
    /// - data: one [ColumnData] per sample column, in column order
    pub fn with_field(&self, spec: FieldSpec, data: Vec<ColumnData>) -> Result<Self> {
        if self.schema.field_index(&spec.name).is_some() {
            return Err(MitoQcError::SchemaMismatch(format!(
                "Field {} already exists",
                spec.name
            )));
        }
        if data.len() != self.cols.len() {
            return Err(MitoQcError::SchemaMismatch(format!(
                "Field {} has data for {} columns, table has {}",
                spec.name,
                data.len(),
                self.cols.len()
            )));
        }

        let mut schema = self.schema.clone();
        schema.fields.push(spec);
        let cols = self
            .cols
            .iter()
            .zip(data)
            .map(|(col, extra)| {
                let mut fields = col.fields.clone();
                fields.push(extra);
                SampleColumn {
                    key: col.key.clone(),
                    fields,
                }
            })
            .collect();

        KeyedTable::new(schema, self.rows.clone(), cols)
    }

    /// New table with only the rows for which `keep` is true.
    pub fn filter_rows<F>(&self, keep: F) -> Self
    where
        F: Fn(&RowKey) -> bool,
    {
        let indices: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| keep(r))
            .map(|(i, _)| i)
            .collect();

        KeyedTable {
            schema: self.schema.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            cols: self
                .cols
                .iter()
                .map(|col| SampleColumn {
                    key: col.key.clone(),
                    fields: col.fields.iter().map(|d| d.select(&indices)).collect(),
                })
                .collect(),
        }
    }

    /// New table restricted to the named fields, in the given order.
    pub fn select_fields(&self, names: &[&str]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| self.schema.require_field(name))
            .collect::<Result<Vec<usize>>>()?;

        let schema = Schema::new(
            self.schema.key_kind,
            indices.iter().map(|&i| self.schema.fields[i].clone()).collect(),
        );
        let cols = self
            .cols
            .iter()
            .map(|col| SampleColumn {
                key: col.key.clone(),
                fields: indices.iter().map(|&i| col.fields[i].clone()).collect(),
            })
            .collect();

        KeyedTable::new(schema, self.rows.clone(), cols)
    }

    ///
    /// Row indices grouped by target label, labels in ascending order and
    /// indices in row (position) order.
    ///
    pub fn target_groups(&self) -> Result<Vec<(String, Vec<usize>)>> {
        if self.schema.key_kind != RowKeyKind::LocusTarget {
            return Err(MitoQcError::SchemaMismatch(
                "Table rows are not keyed by target".to_string(),
            ));
        }

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, row) in self.rows.iter().enumerate() {
            if let Some(target) = row.target() {
                groups.entry(target).or_default().push(idx);
            }
        }

        Ok(groups
            .into_iter()
            .map(|(target, idx)| (target.to_string(), idx))
            .collect())
    }

    pub fn into_parts(self) -> (Schema, Vec<RowKey>, Vec<SampleColumn>) {
        (self.schema, self.rows, self.cols)
    }
}
