use fxhash::FxHashMap;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};

use mitoqc_core::errors::{MitoQcError, Result};
use mitoqc_core::models::{KeyedTable, TargetInterval};

pub const DEFAULT_LABEL_WIDTH: usize = 9;

/// Where target bounds come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsMode {
    /// Observed min/max position of each target's rows.
    #[default]
    Derive,
    /// A fixed-width `|<min>_<max>` suffix on the target label.
    Label,
}

///
/// Supplies the trimmed interval of every target present in a table.
///
pub trait TargetBoundsProvider: Send + Sync {
    fn bounds(&self, table: &KeyedTable) -> Result<Vec<TargetInterval>>;
}

#[derive(Debug, Clone)]
pub struct DeriveFromData {
    pub trim_bases: i64,
}

impl TargetBoundsProvider for DeriveFromData {
    fn bounds(&self, table: &KeyedTable) -> Result<Vec<TargetInterval>> {
        let rows = table.rows();
        table
            .target_groups()?
            .iter()
            .map(|(target, idx)| {
                let lo = idx.iter().map(|&i| rows[i].pos as i64).min().unwrap_or(0);
                let hi = idx.iter().map(|&i| rows[i].pos as i64).max().unwrap_or(-1);
                TargetInterval::trimmed(target, lo, hi, self.trim_bases)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ParseFromLabel {
    pub trim_bases: i64,
    pub width: usize,
    pattern: Regex,
}

impl ParseFromLabel {
    pub fn new(trim_bases: i64, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(MitoQcError::InvalidConfig(
                "label width must be at least 1".to_string(),
            ));
        }
        let pattern = Regex::new(&format!(r"\|(\d{{{w}}})_(\d{{{w}}})$", w = width))
            .map_err(|e| MitoQcError::InvalidConfig(format!("bad label pattern: {}", e)))?;
        Ok(ParseFromLabel {
            trim_bases,
            width,
            pattern,
        })
    }

    /// Untrimmed `(min, max)` encoded in a label such as `numt_3|000000100_000000200`.
    pub fn parse_label(&self, label: &str) -> Result<(i64, i64)> {
        let caps = self
            .pattern
            .captures(label)
            .ok_or_else(|| MitoQcError::InvalidLabel(label.to_string()))?;
        let lo = caps[1]
            .parse::<i64>()
            .map_err(|_| MitoQcError::InvalidLabel(label.to_string()))?;
        let hi = caps[2]
            .parse::<i64>()
            .map_err(|_| MitoQcError::InvalidLabel(label.to_string()))?;
        if lo > hi {
            return Err(MitoQcError::InvalidLabel(format!(
                "{} (start after end)",
                label
            )));
        }
        Ok((lo, hi))
    }
}

impl TargetBoundsProvider for ParseFromLabel {
    fn bounds(&self, table: &KeyedTable) -> Result<Vec<TargetInterval>> {
        table
            .target_groups()?
            .iter()
            .map(|(target, _)| {
                let (lo, hi) = self.parse_label(target)?;
                TargetInterval::trimmed(target, lo, hi, self.trim_bases)
            })
            .collect()
    }
}

/// Build the provider for a configured mode.
pub fn bounds_provider(
    mode: BoundsMode,
    trim_bases: i64,
    label_width: usize,
) -> Result<Box<dyn TargetBoundsProvider>> {
    if trim_bases < 0 {
        return Err(MitoQcError::InvalidConfig(format!(
            "trim_bases must be non-negative, got {}",
            trim_bases
        )));
    }
    match mode {
        BoundsMode::Derive => Ok(Box::new(DeriveFromData { trim_bases })),
        BoundsMode::Label => Ok(Box::new(ParseFromLabel::new(trim_bases, label_width)?)),
    }
}

///
/// Drop every row outside its target's trimmed window, and every row
/// whose target has no bounds. Any empty window aborts the whole prune.
///
pub fn prune(table: &KeyedTable, provider: &dyn TargetBoundsProvider) -> Result<KeyedTable> {
    let intervals = provider.bounds(table)?;
    let by_target: FxHashMap<&str, &TargetInterval> = intervals
        .iter()
        .map(|iv| (iv.target.as_str(), iv))
        .collect();

    let pruned = table.filter_rows(|row| {
        row.target()
            .and_then(|t| by_target.get(t))
            .is_some_and(|iv| iv.contains(row.pos as i64))
    });

    info!(
        "Pruned {} targets: kept {} of {} rows",
        intervals.len(),
        pruned.n_rows(),
        table.n_rows()
    );
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use mitoqc_core::models::{ElementType, FieldSpec, RowKey, RowKeyKind, Schema, Value};

    fn target_table(targets: &[(&str, i32, i32)]) -> KeyedTable {
        let mut records = Vec::new();
        for &(target, lo, hi) in targets {
            for pos in lo..=hi {
                records.push((
                    RowKey::with_target("chr1", pos, target),
                    vec![Some(Value::Int32(1))],
                ));
            }
        }
        KeyedTable::from_sample_records(
            Schema::new(
                RowKeyKind::LocusTarget,
                vec![FieldSpec::new("coverage", ElementType::Int32)],
            ),
            "s1",
            records,
        )
        .unwrap()
    }

    #[rstest]
    fn test_derive_trims_both_ends() {
        let table = target_table(&[("T", 100, 200)]);
        let bounds = DeriveFromData { trim_bases: 10 }.bounds(&table).unwrap();
        assert_eq!(
            bounds,
            vec![TargetInterval {
                target: "T".to_string(),
                min_pos: 110,
                max_pos: 190,
            }]
        );

        let pruned = prune(&table, &DeriveFromData { trim_bases: 10 }).unwrap();
        assert_eq!(pruned.n_rows(), 81);
        assert_eq!(pruned.rows()[0].pos, 110);
        assert_eq!(pruned.rows()[80].pos, 190);
    }

    #[rstest]
    fn test_derive_too_small_aborts() {
        let table = target_table(&[("ok", 1, 1000), ("T", 100, 190)]);
        let err = prune(&table, &DeriveFromData { trim_bases: 46 }).unwrap_err();
        assert!(matches!(err, MitoQcError::IntervalTooSmall { .. }));
    }

    #[rstest]
    fn test_parse_label() {
        let provider = ParseFromLabel::new(0, 9).unwrap();
        assert_eq!(
            provider.parse_label("numt_3|000000100_000000200").unwrap(),
            (100, 200)
        );
        assert!(matches!(
            provider.parse_label("numt_3|100_200"),
            Err(MitoQcError::InvalidLabel(_))
        ));
        assert!(matches!(
            provider.parse_label("numt_3"),
            Err(MitoQcError::InvalidLabel(_))
        ));
    }

    #[rstest]
    fn test_label_mode_prunes_by_encoded_bounds() {
        let table = target_table(&[("n|003_007", 1, 10)]);
        let provider = bounds_provider(BoundsMode::Label, 1, 3).unwrap();
        let pruned = prune(&table, provider.as_ref()).unwrap();
        let positions: Vec<i32> = pruned.rows().iter().map(|r| r.pos).collect();
        assert_eq!(positions, vec![4, 5, 6]);
    }

    #[rstest]
    fn test_locus_table_rejected() {
        let table = KeyedTable::from_sample_records(
            Schema::new(
                RowKeyKind::Locus,
                vec![FieldSpec::new("coverage", ElementType::Int32)],
            ),
            "s1",
            vec![(RowKey::locus("chr1", 1), vec![Some(Value::Int32(1))])],
        )
        .unwrap();
        assert!(prune(&table, &DeriveFromData { trim_bases: 0 }).is_err());
    }
}
