//! Per-row and per-target aggregate statistics across the sample axis.

use std::fmt::{self, Display};

use rayon::prelude::*;

use mitoqc_core::errors::{MitoQcError, Result};
use mitoqc_core::models::{ElementType, KeyedTable, RowKey};

/// How rows are grouped before aggregating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowGroupKey {
    /// Every row is its own group.
    Row,
    /// Rows sharing a target label form one group.
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupLabel {
    Row(RowKey),
    Target(String),
}

impl Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupLabel::Row(key) => write!(f, "{}", key),
            GroupLabel::Target(target) => write!(f, "{}", target),
        }
    }
}

/// A condition on a numeric entry. Null entries never satisfy it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    Above(f64),
    Below(f64),
}

impl Predicate {
    pub fn test(&self, value: f64) -> bool {
        match self {
            Predicate::Above(cut) => value > *cut,
            Predicate::Below(cut) => value < *cut,
        }
    }

    /// Column name used when the predicate's proportion is exported.
    pub fn label(&self) -> String {
        match self {
            Predicate::Above(cut) => format!("over_{}", cut),
            Predicate::Below(cut) => format!("under_{}", cut),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub label: GroupLabel,
    /// Rows in the group.
    pub rows: usize,
    /// Entries in the group, rows times samples, nulls included.
    pub entries: usize,
    pub non_null: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// One count per predicate.
    pub counts: Vec<usize>,
}

impl GroupStats {
    /// Share of all entries (nulls included) satisfying predicate `idx`.
    pub fn proportion(&self, idx: usize) -> f64 {
        if self.entries == 0 {
            return 0.0;
        }
        self.counts[idx] as f64 / self.entries as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedStats {
    pub field: String,
    pub group_by: RowGroupKey,
    pub predicates: Vec<Predicate>,
    pub groups: Vec<GroupStats>,
}

/// Median of a non-empty sample; the half-sum of the middle two for even counts.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        Some((values[n / 2 - 1] + values[n / 2]) / 2.0)
    } else {
        Some(values[n / 2])
    }
}

fn group_stats(
    table: &KeyedTable,
    field: usize,
    label: GroupLabel,
    rows: &[usize],
    predicates: &[Predicate],
) -> GroupStats {
    let mut values: Vec<f64> = Vec::with_capacity(rows.len() * table.n_cols());
    for col in 0..table.n_cols() {
        let data = table.column_field(col, field);
        values.extend(rows.iter().filter_map(|&row| data.get_f64(row)));
    }

    let counts = predicates
        .iter()
        .map(|p| values.iter().filter(|&&v| p.test(v)).count())
        .collect();
    let mean = match values.is_empty() {
        true => None,
        false => Some(values.iter().sum::<f64>() / values.len() as f64),
    };

    GroupStats {
        label,
        rows: rows.len(),
        entries: rows.len() * table.n_cols(),
        non_null: values.len(),
        mean,
        median: median(&mut values),
        counts,
    }
}

///
/// Aggregate a numeric field across samples, per row or per target.
///
/// # Arguments
/// - table: the table to summarise
/// - field: numeric entry field
/// - group_by: each row alone, or rows grouped by target
/// - predicates: conditions counted per group
pub fn annotate(
    table: &KeyedTable,
    field: &str,
    group_by: RowGroupKey,
    predicates: &[Predicate],
) -> Result<GroupedStats> {
    let field_idx = table.schema().require_field(field)?;
    if table.schema().fields[field_idx].element_type == ElementType::Str {
        return Err(MitoQcError::SchemaMismatch(format!(
            "Field {} is not numeric",
            field
        )));
    }

    let groups: Vec<(GroupLabel, Vec<usize>)> = match group_by {
        RowGroupKey::Row => table
            .rows()
            .iter()
            .enumerate()
            .map(|(idx, key)| (GroupLabel::Row(key.clone()), vec![idx]))
            .collect(),
        RowGroupKey::Target => table
            .target_groups()?
            .into_iter()
            .map(|(target, rows)| (GroupLabel::Target(target), rows))
            .collect(),
    };

    let groups = groups
        .into_par_iter()
        .map(|(label, rows)| group_stats(table, field_idx, label, &rows, predicates))
        .collect();

    Ok(GroupedStats {
        field: field.to_string(),
        group_by,
        predicates: predicates.to_vec(),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use mitoqc_core::models::{ColumnData, FieldSpec, RowKeyKind, SampleColumn, Schema};

    #[fixture]
    fn table() -> KeyedTable {
        let rows = vec![
            RowKey::with_target("chrM", 1, "A"),
            RowKey::with_target("chrM", 2, "A"),
            RowKey::with_target("chrM", 3, "B"),
        ];
        let schema = Schema::new(
            RowKeyKind::LocusTarget,
            vec![FieldSpec::new("coverage", ElementType::Int32)],
        );
        let cols = vec![
            SampleColumn {
                key: "s1".to_string(),
                fields: vec![ColumnData::Int32(vec![Some(150), Some(50), None])],
            },
            SampleColumn {
                key: "s2".to_string(),
                fields: vec![ColumnData::Int32(vec![Some(250), None, None])],
            },
        ];
        KeyedTable::new(schema, rows, cols).unwrap()
    }

    #[rstest]
    #[case(vec![3.0, 1.0, 2.0], Some(2.0))]
    #[case(vec![4.0, 1.0, 2.0, 3.0], Some(2.5))]
    #[case(vec![], None)]
    fn test_median(#[case] mut values: Vec<f64>, #[case] expected: Option<f64>) {
        assert_eq!(median(&mut values), expected);
    }

    #[rstest]
    fn test_per_row_stats(table: KeyedTable) {
        let stats = annotate(
            &table,
            "coverage",
            RowGroupKey::Row,
            &[Predicate::Above(100.0)],
        )
        .unwrap();

        assert_eq!(stats.groups.len(), 3);
        let first = &stats.groups[0];
        assert_eq!(first.mean, Some(200.0));
        assert_eq!(first.median, Some(200.0));
        assert_eq!(first.proportion(0), 1.0);

        let second = &stats.groups[1];
        assert_eq!(second.mean, Some(50.0));
        assert_eq!(second.non_null, 1);
        assert_eq!(second.proportion(0), 0.0);

        let all_null = &stats.groups[2];
        assert_eq!(all_null.mean, None);
        assert_eq!(all_null.median, None);
        assert_eq!(all_null.entries, 2);
    }

    #[rstest]
    fn test_per_target_stats(table: KeyedTable) {
        let stats = annotate(
            &table,
            "coverage",
            RowGroupKey::Target,
            &[Predicate::Above(100.0), Predicate::Below(100.0)],
        )
        .unwrap();

        let a = &stats.groups[0];
        assert_eq!(a.label, GroupLabel::Target("A".to_string()));
        assert_eq!(a.rows, 2);
        assert_eq!(a.entries, 4);
        assert_eq!(a.counts, vec![2, 1]);
        assert_eq!(a.proportion(0), 0.5);
        assert_eq!(a.median, Some(150.0));
    }

    #[rstest]
    fn test_predicate_label() {
        assert_eq!(Predicate::Above(100.0).label(), "over_100");
        assert_eq!(Predicate::Above(1000.0).label(), "over_1000");
    }

    #[rstest]
    fn test_missing_field(table: KeyedTable) {
        assert!(matches!(
            annotate(&table, "depth", RowGroupKey::Row, &[]),
            Err(MitoQcError::MissingField(_))
        ));
    }
}
