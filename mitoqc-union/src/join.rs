use std::cmp::Ordering;

use mitoqc_core::errors::{MitoQcError, Result};
use mitoqc_core::models::{ColumnData, FieldSpec, KeyedTable, RowKey, SampleColumn, Schema};

///
/// Union of the fields of several schemas, in order of first appearance.
/// A field declared with two different element types is a mismatch.
///
fn merge_schemas(tables: &[KeyedTable]) -> Result<Schema> {
    let key_kind = tables[0].schema().key_kind;
    let mut fields: Vec<FieldSpec> = Vec::new();

    for table in tables {
        let schema = table.schema();
        if schema.key_kind != key_kind {
            return Err(MitoQcError::SchemaMismatch(format!(
                "Row key kinds differ: {:?} and {:?}",
                key_kind, schema.key_kind
            )));
        }
        for spec in &schema.fields {
            match fields.iter().find(|f| f.name == spec.name) {
                Some(existing) if existing.element_type != spec.element_type => {
                    return Err(MitoQcError::SchemaMismatch(format!(
                        "Field {} is {} in one table and {} in another",
                        spec.name, existing.element_type, spec.element_type
                    )));
                }
                Some(_) => {}
                None => fields.push(spec.clone()),
            }
        }
    }

    Ok(Schema::new(key_kind, fields))
}

///
/// For each merged row, the index of the same row in `source`, if present.
/// Both slices are strictly ascending.
///
fn align_rows(merged: &[RowKey], source: &[RowKey]) -> Vec<Option<usize>> {
    let mut aligned = Vec::with_capacity(merged.len());
    let mut j = 0;
    for row in merged {
        while j < source.len() && source[j] < *row {
            j += 1;
        }
        match source.get(j).map(|s| s.cmp(row)) {
            Some(Ordering::Equal) => aligned.push(Some(j)),
            _ => aligned.push(None),
        }
    }
    aligned
}

///
/// Outer-join a group of tables on their row keys.
///
/// Columns are concatenated in group order. The row set is the union of
/// the inputs' row sets, and every entry a table did not have comes out as
/// a typed null.
///
/// # Arguments
/// - tables: the group to join; must share a row key kind and have
///   pairwise-disjoint column keys
pub fn multi_way_join(tables: &[KeyedTable]) -> Result<KeyedTable> {
    if tables.is_empty() {
        return Err(MitoQcError::EmptyInput("no tables to join".to_string()));
    }
    if tables.len() == 1 {
        return Ok(tables[0].clone());
    }

    let schema = merge_schemas(tables)?;

    let mut rows: Vec<RowKey> = tables
        .iter()
        .flat_map(|t| t.rows().iter().cloned())
        .collect();
    rows.sort();
    rows.dedup();

    let mut cols: Vec<SampleColumn> = Vec::with_capacity(tables.iter().map(|t| t.n_cols()).sum());
    for table in tables {
        let aligned = align_rows(&rows, table.rows());
        for col in table.cols() {
            let fields = schema
                .fields
                .iter()
                .map(|spec| match table.schema().field_index(&spec.name) {
                    Some(idx) => col.fields[idx].gather(&aligned),
                    None => ColumnData::nulls(spec.element_type, rows.len()),
                })
                .collect();
            cols.push(SampleColumn {
                key: col.key.clone(),
                fields,
            });
        }
    }

    KeyedTable::new(schema, rows, cols)
}
