use rayon::prelude::*;

use mitoqc_core::errors::Result;

use crate::poisson::ClassifiedTable;

///
/// Outlier counts of one sample over one target: `n` positions, and the
/// number flagged high or low at each threshold.
///
#[derive(Debug, Clone, PartialEq)]
pub struct PerTargetStat {
    pub target: String,
    pub sample: String,
    pub n: usize,
    pub n_hi: Vec<usize>,
    pub n_lo: Vec<usize>,
}

impl PerTargetStat {
    pub fn prop_hi(&self, idx: usize) -> f64 {
        proportion(self.n_hi[idx], self.n)
    }

    pub fn prop_lo(&self, idx: usize) -> f64 {
        proportion(self.n_lo[idx], self.n)
    }
}

fn proportion(count: usize, total: usize) -> f64 {
    match total {
        0 => 0.0,
        _ => count as f64 / total as f64,
    }
}

/// Per (target, sample) stats, ordered by target then by sample column.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetStats {
    pub thresholds: Vec<f64>,
    pub stats: Vec<PerTargetStat>,
}

///
/// Count flagged positions per (target, sample). `n` counts every row of
/// the target; null flags count as not flagged.
///
pub fn per_target_stats(classified: &ClassifiedTable) -> Result<TargetStats> {
    let table = &classified.table;
    let flags = classified.flag_indices()?;
    let groups = table.target_groups()?;

    let stats = groups
        .par_iter()
        .flat_map_iter(|(target, rows)| {
            let flags = &flags;
            table.cols().iter().enumerate().map(move |(col_idx, col)| {
                let count = |field: usize| {
                    let data = table.column_field(col_idx, field);
                    rows.iter().filter(|&&r| data.get_i32(r) == Some(1)).count()
                };
                PerTargetStat {
                    target: target.clone(),
                    sample: col.key.clone(),
                    n: rows.len(),
                    n_hi: flags.iter().map(|&(hi, _)| count(hi)).collect(),
                    n_lo: flags.iter().map(|&(_, lo)| count(lo)).collect(),
                }
            })
        })
        .collect();

    Ok(TargetStats {
        thresholds: classified.thresholds.clone(),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::collections::BTreeMap;

    use mitoqc_core::models::{
        ColumnData, ElementType, FieldSpec, KeyedTable, RowKey, RowKeyKind, SampleColumn, Schema,
    };

    use crate::poisson::classify;

    #[rstest]
    fn test_counts_per_target_and_sample() {
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
                fields: vec![ColumnData::Int32(vec![Some(500), None, Some(0)])],
            },
            SampleColumn {
                key: "s2".to_string(),
                fields: vec![ColumnData::Int32(vec![Some(50), Some(50), Some(50)])],
            },
        ];
        let table = KeyedTable::new(schema, rows, cols).unwrap();
        let means = BTreeMap::from([("s1".to_string(), 50.0), ("s2".to_string(), 50.0)]);
        let classified = classify(&table, &means, "coverage", &[0.025]).unwrap();

        let stats = per_target_stats(&classified).unwrap();
        assert_eq!(stats.stats.len(), 4);

        let a_s1 = &stats.stats[0];
        assert_eq!((a_s1.target.as_str(), a_s1.sample.as_str()), ("A", "s1"));
        assert_eq!(a_s1.n, 2);
        assert_eq!(a_s1.n_hi, vec![1]);
        assert_eq!(a_s1.prop_hi(0), 0.5);

        let b_s1 = &stats.stats[2];
        assert_eq!(b_s1.n_lo, vec![1]);
        assert_eq!(b_s1.prop_lo(0), 1.0);

        let b_s2 = &stats.stats[3];
        assert_eq!((b_s2.n_hi[0], b_s2.n_lo[0]), (0, 0));
    }
}
