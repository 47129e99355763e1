use fxhash::FxHashSet;
use log::{debug, info};
use rayon::prelude::*;

use mitoqc_core::errors::{MitoQcError, Result};
use mitoqc_core::models::KeyedTable;

use crate::checkpoint::CheckpointStore;
use crate::join::multi_way_join;

/// Fan-in actually used for a configured chunk size; one table per group
/// could never shrink the list.
fn effective_fan_in(chunk_size: usize) -> usize {
    chunk_size.max(2)
}

///
/// One stage of the hierarchical union: consecutive groups of `fan_in`
/// tables are joined in parallel. The output keeps group order.
///
pub fn reduce_stage(tables: &[KeyedTable], fan_in: usize) -> Result<Vec<KeyedTable>> {
    if fan_in < 2 {
        return Err(MitoQcError::InvalidConfig(format!(
            "stage fan-in must be at least 2, got {}",
            fan_in
        )));
    }
    tables.par_chunks(fan_in).map(multi_way_join).collect()
}

fn validate_inputs(tables: &[KeyedTable]) -> Result<()> {
    let key_kind = tables[0].schema().key_kind;
    let mut seen: FxHashSet<&str> = FxHashSet::default();

    for table in tables {
        if table.schema().key_kind != key_kind {
            return Err(MitoQcError::SchemaMismatch(format!(
                "Row key kinds differ: {:?} and {:?}",
                key_kind,
                table.schema().key_kind
            )));
        }
        for key in table.col_keys() {
            if !seen.insert(key) {
                return Err(MitoQcError::DuplicateKey(format!(
                    "column {} appears in more than one table",
                    key
                )));
            }
        }
    }
    Ok(())
}

///
/// Merge a list of keyed tables into one.
///
/// Every input column appears exactly once in the result, the row set is the
/// union of the inputs' row sets, and entries a table did not have are typed
/// nulls. Each merged group is checkpointed before the next stage starts.
///
/// # Arguments
/// - tables: the tables to merge; same row key kind, disjoint column keys
/// - chunk_size: number of tables joined per group at each stage
/// - store: where merged groups are checkpointed
pub fn union(
    tables: Vec<KeyedTable>,
    chunk_size: usize,
    store: &dyn CheckpointStore,
) -> Result<KeyedTable> {
    if chunk_size == 0 {
        return Err(MitoQcError::InvalidConfig(
            "chunk_size must be at least 1".to_string(),
        ));
    }
    if tables.is_empty() {
        return Err(MitoQcError::EmptyInput("no tables to union".to_string()));
    }
    validate_inputs(&tables)?;

    let fan_in = effective_fan_in(chunk_size);
    let mut staging = tables;
    let mut stage = 0;

    while staging.len() > 1 {
        info!(
            "Stage {}: merging {} tables in groups of {}",
            stage,
            staging.len(),
            fan_in
        );
        let next_stage = reduce_stage(&staging, fan_in)?;

        next_stage
            .par_iter()
            .enumerate()
            .try_for_each(|(job, table)| {
                debug!(
                    "Stage {} job {}: {} rows, {} columns",
                    stage,
                    job,
                    table.n_rows(),
                    table.n_cols()
                );
                store.write(stage, job, table)
            })?;
        store.complete_stage(stage, next_stage.len())?;

        info!("Completed stage {}", stage);
        stage += 1;
        staging = next_stage;
    }

    staging
        .pop()
        .ok_or_else(|| MitoQcError::EmptyInput("no tables to union".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use mitoqc_core::models::{ElementType, FieldSpec, RowKey, RowKeyKind, Schema, Value};

    use crate::checkpoint::MemoryCheckpointStore;

    fn sample(name: &str, positions: &[i32]) -> KeyedTable {
        KeyedTable::from_sample_records(
            Schema::new(
                RowKeyKind::Locus,
                vec![FieldSpec::new("coverage", ElementType::Int32)],
            ),
            name,
            positions
                .iter()
                .map(|&p| (RowKey::locus("chrM", p), vec![Some(Value::Int32(p * 10))]))
                .collect(),
        )
        .unwrap()
    }

    #[fixture]
    fn samples() -> Vec<KeyedTable> {
        vec![
            sample("a", &[1, 2]),
            sample("b", &[2, 3]),
            sample("c", &[5]),
            sample("d", &[1, 5]),
            sample("e", &[4]),
        ]
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(100)]
    fn test_chunking_invariance(samples: Vec<KeyedTable>, #[case] chunk_size: usize) {
        let store = MemoryCheckpointStore::new();
        let reference = multi_way_join(&samples).unwrap();
        let merged = union(samples, chunk_size, &store).unwrap();
        assert_eq!(merged, reference);
        assert_eq!(merged.col_keys(), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(merged.n_rows(), 5);
    }

    #[rstest]
    fn test_checkpoints_every_group(samples: Vec<KeyedTable>) {
        let store = MemoryCheckpointStore::new();
        union(samples, 2, &store).unwrap();
        // 5 -> 3 -> 2 -> 1
        assert_eq!(store.len(), 6);
        assert_eq!(store.read(2, 0).unwrap().n_cols(), 5);
    }

    #[rstest]
    fn test_single_table_passes_through() {
        let store = MemoryCheckpointStore::new();
        let only = sample("a", &[1]);
        assert_eq!(union(vec![only.clone()], 3, &store).unwrap(), only);
        assert!(store.is_empty());
    }

    #[rstest]
    fn test_union_errors(samples: Vec<KeyedTable>) {
        let store = MemoryCheckpointStore::new();
        assert!(matches!(
            union(vec![], 2, &store),
            Err(MitoQcError::EmptyInput(_))
        ));
        assert!(matches!(
            union(samples.clone(), 0, &store),
            Err(MitoQcError::InvalidConfig(_))
        ));

        let mut duplicated = samples;
        duplicated.push(sample("a", &[9]));
        assert!(matches!(
            union(duplicated, 2, &store),
            Err(MitoQcError::DuplicateKey(_))
        ));
    }

    #[rstest]
    fn test_reduce_stage_keeps_group_order(samples: Vec<KeyedTable>) {
        let reduced = reduce_stage(&samples, 2).unwrap();
        assert_eq!(reduced.len(), 3);
        assert_eq!(reduced[0].col_keys(), vec!["a", "b"]);
        assert_eq!(reduced[2].col_keys(), vec!["e"]);
    }
}
