use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use rstest::*;

use mitoqc_core::models::{
    ColumnData, ElementType, FieldSpec, KeyedTable, RowKey, RowKeyKind, SampleColumn, Schema,
};
use mitoqc_stats::{NumtAnalysisParams, run_numt_analysis, write_target_report};

const SAMPLES: [&str; 3] = ["s1", "s2", "s3"];

/// `targets` labels, positions `1..=len` each; coverage 50 except the
/// `(sample, label, pos)` spikes, which are 200.
fn region_table(targets: &[(&str, i32)], spikes: &[(&str, &str, i32)]) -> KeyedTable {
    let mut rows = Vec::new();
    for &(label, len) in targets {
        for pos in 1..=len {
            rows.push(RowKey::with_target("chr1", pos, label));
        }
    }
    let cols = SAMPLES
        .iter()
        .map(|&s| {
            let values = rows
                .iter()
                .map(|r| {
                    let spiked = spikes.iter().any(|&(ss, t, p)| {
                        ss == s && Some(t) == r.target() && p == r.pos
                    });
                    Some(if spiked { 200 } else { 50 })
                })
                .collect();
            SampleColumn {
                key: s.to_string(),
                fields: vec![ColumnData::Int32(values)],
            }
        })
        .collect();
    KeyedTable::new(
        Schema::new(
            RowKeyKind::LocusTarget,
            vec![FieldSpec::new("coverage", ElementType::Int32)],
        ),
        rows,
        cols,
    )
    .unwrap()
}

#[fixture]
fn means() -> BTreeMap<String, f64> {
    SAMPLES.iter().map(|s| (s.to_string(), 50.0)).collect()
}

#[fixture]
fn params() -> NumtAnalysisParams {
    NumtAnalysisParams {
        trim_bases: 0,
        ..NumtAnalysisParams::default()
    }
}

#[rstest]
fn test_single_spike_end_to_end(means: BTreeMap<String, f64>, params: NumtAnalysisParams) {
    let targets = region_table(&[("T", 10)], &[("s1", "T", 5)]);

    let report = run_numt_analysis(&targets, None, Some(&means), &params).unwrap();
    assert_eq!(report.stats.stats.len(), 3);
    assert!(report.p_values.is_none());

    let s1 = &report.stats.stats[0];
    assert_eq!((s1.target.as_str(), s1.sample.as_str()), ("T", "s1"));
    assert_eq!(s1.n, 10);
    assert_eq!(s1.n_hi[0], 1);
    assert_eq!(s1.prop_hi(0), 0.1);

    for other in &report.stats.stats[1..] {
        assert_eq!(other.n_hi[0], 0);
        assert_eq!(other.n, 10);
    }
}

#[rstest]
fn test_null_scoring_end_to_end(means: BTreeMap<String, f64>, params: NumtAnalysisParams) {
    let targets = region_table(&[("T", 10)], &[("s1", "T", 5)]);
    let nulls = region_table(
        &[("null_1", 10), ("null_2", 10), ("null_3", 10), ("null_4", 10)],
        &[("s1", "null_2", 1), ("s1", "null_2", 2), ("s2", "null_3", 9)],
    );

    let report = run_numt_analysis(&targets, Some(&nulls), Some(&means), &params).unwrap();
    let p_values = report.p_values.as_ref().unwrap();
    assert_eq!(p_values.len(), 3);
    assert_eq!(report.population.as_ref().unwrap().n_tracks(), 4);

    for p in p_values {
        assert_eq!(p.p_hi.len(), params.thresholds.len());
        assert!(p.p_hi.iter().chain(&p.p_lo).all(|v| (0.0..=1.0).contains(v)));
    }

    // s1 (prop_hi 0.1) is beaten only by its spiked null, where every rank is occupied
    assert_eq!(p_values[0].p_hi[0], 0.25);
    // s3 has neither spikes nor spiked nulls
    assert_eq!(p_values[2].p_hi[0], 0.0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("numts_out.tsv");
    write_target_report(&path, &report.stats, report.p_values.as_deref()).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 4);
}

#[rstest]
fn test_subsampling_is_reproducible(means: BTreeMap<String, f64>) {
    let targets = region_table(&[("T", 10)], &[]);
    let nulls = region_table(
        &[("null_1", 10), ("null_2", 10), ("null_3", 10)],
        &[("s1", "null_3", 1)],
    );
    let params = NumtAnalysisParams {
        trim_bases: 0,
        n_pick: 2,
        ..NumtAnalysisParams::default()
    };

    let first = run_numt_analysis(&targets, Some(&nulls), Some(&means), &params).unwrap();
    let second = run_numt_analysis(&targets, Some(&nulls), Some(&means), &params).unwrap();
    assert_eq!(first.population, second.population);
    assert_eq!(
        first.population.unwrap().targets,
        vec!["null_1".to_string(), "null_2".to_string()]
    );
}

#[rstest]
fn test_means_default_to_unpruned_table(params: NumtAnalysisParams) {
    let targets = region_table(&[("T", 10)], &[("s1", "T", 5)]);
    let report = run_numt_analysis(&targets, None, None, &params).unwrap();
    // s1 mean is 65, and 200 is still far in the upper tail
    assert_eq!(report.stats.stats[0].n_hi[0], 1);
}

#[rstest]
fn test_nulls_use_target_table_means(params: NumtAnalysisParams) {
    let targets = region_table(&[("T", 10)], &[]);
    // a null-table mean for s1 would be 95, putting every 50 in the low tail
    let nulls = region_table(
        &[("null_1", 10)],
        &[("s1", "null_1", 1), ("s1", "null_1", 2), ("s1", "null_1", 3)],
    );

    let report = run_numt_analysis(&targets, Some(&nulls), None, &params).unwrap();
    let population = report.population.unwrap();
    let s1 = &population.samples["s1"];
    assert_eq!(s1.lo[0][0], vec![0; 10]);
    assert_eq!(s1.hi[0][0], vec![1, 2, 3, 3, 3, 3, 3, 3, 3, 3]);
}
