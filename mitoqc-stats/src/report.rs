use std::path::Path;

use anyhow::{Context, Result};

use mitoqc_core::models::{KeyedTable, NULL_TOKEN, RowKeyKind};
use mitoqc_io::consts::{CHROM_COL, POS_COL, SAMPLE_COL, TARGET_COL};
use mitoqc_io::tsv::create_tsv;

use crate::annotate::{GroupLabel, GroupedStats};
use crate::nulls::TargetPValues;
use crate::poisson::threshold_suffix;
use crate::targets::TargetStats;

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NULL_TOKEN.to_string(),
    }
}

///
/// Header of the per-target output:
/// `target s N N_hi* N_lo* prop_hi* prop_lo* [p_val_hi* p_val_lo*]`,
/// each starred group holding one column per threshold.
///
pub fn target_report_header(thresholds: &[f64], with_p_values: bool) -> Vec<String> {
    let suffixes: Vec<String> = thresholds
        .iter()
        .enumerate()
        .map(|(i, &a)| threshold_suffix(i, a))
        .collect();

    let mut header = vec![TARGET_COL.to_string(), SAMPLE_COL.to_string(), "N".to_string()];
    let mut groups = vec!["N_hi", "N_lo", "prop_hi", "prop_lo"];
    if with_p_values {
        groups.extend(["p_val_hi", "p_val_lo"]);
    }
    for group in groups {
        header.extend(suffixes.iter().map(|s| format!("{}{}", group, s)));
    }
    header
}

///
/// Write one row per (target, sample).
///
/// # Arguments
/// - path: output TSV, optionally `.gz`
/// - stats: per-target counts
/// - p_values: empirical p-values aligned with `stats.stats`, or `None` for a
///   target-only report
pub fn write_target_report(
    path: &Path,
    stats: &TargetStats,
    p_values: Option<&[TargetPValues]>,
) -> Result<()> {
    if let Some(p) = p_values {
        if p.len() != stats.stats.len() {
            anyhow::bail!(
                "{} p-value rows for {} target rows",
                p.len(),
                stats.stats.len()
            );
        }
    }

    let n_thresholds = stats.thresholds.len();
    let mut writer = create_tsv(path)?;
    writer.write_record(target_report_header(&stats.thresholds, p_values.is_some()))?;

    for (row, stat) in stats.stats.iter().enumerate() {
        let mut record = vec![stat.target.clone(), stat.sample.clone(), stat.n.to_string()];
        record.extend(stat.n_hi.iter().map(|c| c.to_string()));
        record.extend(stat.n_lo.iter().map(|c| c.to_string()));
        record.extend((0..n_thresholds).map(|i| stat.prop_hi(i).to_string()));
        record.extend((0..n_thresholds).map(|i| stat.prop_lo(i).to_string()));
        if let Some(p) = p_values {
            record.extend(p[row].p_hi.iter().map(|v| v.to_string()));
            record.extend(p[row].p_lo.iter().map(|v| v.to_string()));
        }
        writer.write_record(&record)?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write target report {:?}", path))?;
    Ok(())
}

///
/// Write per-position annotations: `chrom pos [target]`, then
/// `mean_<field> median_<field>` for every summarised field, then the
/// predicate proportions of the first field (`over_100`, ...).
///
pub fn write_position_stats(path: &Path, table: &KeyedTable, stats: &[GroupedStats]) -> Result<()> {
    for s in stats {
        if s.groups.len() != table.n_rows() {
            anyhow::bail!(
                "Stats for {} have {} rows, table has {}",
                s.field,
                s.groups.len(),
                table.n_rows()
            );
        }
    }
    let with_target = table.schema().key_kind == RowKeyKind::LocusTarget;

    let mut header = vec![CHROM_COL.to_string(), POS_COL.to_string()];
    if with_target {
        header.push(TARGET_COL.to_string());
    }
    for s in stats {
        header.push(format!("mean_{}", s.field));
        header.push(format!("median_{}", s.field));
    }
    if let Some(primary) = stats.first() {
        header.extend(primary.predicates.iter().map(|p| p.label()));
    }

    let mut writer = create_tsv(path)?;
    writer.write_record(&header)?;

    for (idx, row) in table.rows().iter().enumerate() {
        let mut record = vec![row.chrom.clone(), row.pos.to_string()];
        if let Some(target) = row.target() {
            record.push(target.to_string());
        }
        for s in stats {
            let group = &s.groups[idx];
            debug_assert_eq!(group.label, GroupLabel::Row(row.clone()));
            record.push(format_optional(group.mean));
            record.push(format_optional(group.median));
        }
        if let Some(primary) = stats.first() {
            let group = &primary.groups[idx];
            record.extend((0..primary.predicates.len()).map(|p| group.proportion(p).to_string()));
        }
        writer.write_record(&record)?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write position stats {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use mitoqc_core::models::{ElementType, FieldSpec, RowKey, Schema, Value};

    use crate::annotate::{Predicate, RowGroupKey, annotate};
    use crate::targets::PerTargetStat;

    #[rstest]
    fn test_header_with_p_values() {
        let header = target_report_header(&[0.025, 5e-5], true);
        assert_eq!(
            header,
            vec![
                "target", "s", "N", "N_hi", "N_hi_5e-5", "N_lo", "N_lo_5e-5", "prop_hi",
                "prop_hi_5e-5", "prop_lo", "prop_lo_5e-5", "p_val_hi", "p_val_hi_5e-5",
                "p_val_lo", "p_val_lo_5e-5",
            ]
        );
        assert_eq!(target_report_header(&[0.025], false).len(), 7);
    }

    #[rstest]
    fn test_write_target_report() {
        let stats = TargetStats {
            thresholds: vec![0.025],
            stats: vec![PerTargetStat {
                target: "T".to_string(),
                sample: "s1".to_string(),
                n: 10,
                n_hi: vec![1],
                n_lo: vec![0],
            }],
        };
        let p = vec![TargetPValues {
            p_hi: vec![0.25],
            p_lo: vec![1.0],
        }];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        write_target_report(&path, &stats, Some(&p)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "target\ts\tN\tN_hi\tN_lo\tprop_hi\tprop_lo\tp_val_hi\tp_val_lo");
        assert_eq!(lines[1], "T\ts1\t10\t1\t0\t0.1\t0\t0.25\t1");
    }

    #[rstest]
    fn test_write_position_stats() {
        let table = KeyedTable::from_sample_records(
            Schema::new(
                RowKeyKind::Locus,
                vec![FieldSpec::new("coverage", ElementType::Int32)],
            ),
            "s1",
            vec![
                (RowKey::locus("chrM", 1), vec![Some(Value::Int32(150))]),
                (RowKey::locus("chrM", 2), vec![None]),
            ],
        )
        .unwrap();
        let stats = annotate(
            &table,
            "coverage",
            RowGroupKey::Row,
            &[Predicate::Above(100.0), Predicate::Above(1000.0)],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cov.tsv");
        write_position_stats(&path, &table, &[stats]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "chrom\tpos\tmean_coverage\tmedian_coverage\tover_100\tover_1000\n\
             chrM\t1\t150\t150\t1\t0\n\
             chrM\t2\tNA\tNA\t0\t0\n"
        );
    }
}
