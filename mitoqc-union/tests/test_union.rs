use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use rstest::*;

use mitoqc_core::models::{RowKey, Value};
use mitoqc_io::{CoverageReadOptions, read_sample_coverage};
use mitoqc_union::{CheckpointStore, DirCheckpointStore, union};

fn write_sample(dir: &Path, sample: &str, rows: &[(i32, i32)]) -> std::path::PathBuf {
    let path = dir.join(format!("{}.tsv", sample));
    let mut contents = String::from("chrom\tpos\ttarget\tcoverage_original\tcoverage_remapped_self\n");
    for (pos, cov) in rows {
        contents.push_str(&format!("chrM\t{}\tT\t{}\t{}\n", pos, cov, cov + 1));
    }
    fs::write(&path, contents).unwrap();
    path
}

#[rstest]
fn test_union_of_sample_files_with_dir_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let options = CoverageReadOptions {
        keep_targets: true,
        expect_shifted: false,
    };

    let tables = [
        ("s1", vec![(1, 10), (2, 20)]),
        ("s2", vec![(2, 22)]),
        ("s3", vec![(3, 33)]),
    ]
    .iter()
    .map(|(sample, rows)| {
        let path = write_sample(dir.path(), sample, rows);
        read_sample_coverage(&path, sample, &options).unwrap()
    })
    .collect::<Vec<_>>();

    let store = DirCheckpointStore::new(dir.path().join("temp")).unwrap();
    let merged = union(tables, 2, &store).unwrap();

    assert_eq!(merged.col_keys(), vec!["s1", "s2", "s3"]);
    assert_eq!(merged.n_rows(), 3);
    let third = RowKey::with_target("chrM", 3, "T");
    assert_eq!(merged.get(&third, "s1", "coverage_original"), None);
    assert_eq!(
        merged.get(&third, "s3", "coverage_remapped_self"),
        Some(Value::Int32(34))
    );

    // 3 -> 2 -> 1
    assert!(store.checkpoint_path(0, 1).exists());
    assert_eq!(store.read(1, 0).unwrap(), merged);
    assert_eq!(store.manifest().unwrap().stages.len(), 2);
}
