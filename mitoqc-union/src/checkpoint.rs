use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use mitoqc_core::errors::{MitoQcError, Result};
use mitoqc_core::models::KeyedTable;
use mitoqc_io::{TableWrite, read_table_file};

pub const MANIFEST_FILE_NAME: &str = "union_manifest.json";

///
/// Durable storage for the merged groups of each union stage. Paths (or
/// keys) are a pure function of the stage and job index, so a re-run
/// overwrites the previous run's checkpoints.
///
pub trait CheckpointStore: Sync {
    fn write(&self, stage: usize, job: usize, table: &KeyedTable) -> Result<()>;

    fn read(&self, stage: usize, job: usize) -> Result<KeyedTable>;

    /// Called once every job of `stage` has been written.
    fn complete_stage(&self, _stage: usize, _jobs: usize) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: usize,
    pub jobs: Vec<PathBuf>,
}

/// Completed stages of one union run, written next to the checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionManifest {
    pub stages: Vec<StageRecord>,
}

///
/// Checkpoints as `.kt` files under a temp directory:
/// `<dir>/stage_<s>_job_<j>.kt`, plus a JSON manifest of completed stages.
///
pub struct DirCheckpointStore {
    dir: PathBuf,
    manifest: Mutex<UnionManifest>,
}

impl DirCheckpointStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(DirCheckpointStore {
            dir,
            manifest: Mutex::new(UnionManifest::default()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checkpoint_path(&self, stage: usize, job: usize) -> PathBuf {
        self.dir.join(format!("stage_{}_job_{}.kt", stage, job))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }

    pub fn manifest(&self) -> Result<UnionManifest> {
        let manifest = self
            .manifest
            .lock()
            .map_err(|_| MitoQcError::Checkpoint("manifest lock poisoned".to_string()))?;
        Ok(manifest.clone())
    }
}

impl CheckpointStore for DirCheckpointStore {
    fn write(&self, stage: usize, job: usize, table: &KeyedTable) -> Result<()> {
        let path = self.checkpoint_path(stage, job);
        table
            .write_table_file(&path)
            .map_err(|e| MitoQcError::Checkpoint(format!("{:#}", e)))
    }

    fn read(&self, stage: usize, job: usize) -> Result<KeyedTable> {
        let path = self.checkpoint_path(stage, job);
        read_table_file(&path).map_err(|e| MitoQcError::Checkpoint(format!("{:#}", e)))
    }

    fn complete_stage(&self, stage: usize, jobs: usize) -> Result<()> {
        let mut manifest = self
            .manifest
            .lock()
            .map_err(|_| MitoQcError::Checkpoint("manifest lock poisoned".to_string()))?;
        manifest.stages.retain(|s| s.stage != stage);
        manifest.stages.push(StageRecord {
            stage,
            jobs: (0..jobs).map(|job| self.checkpoint_path(stage, job)).collect(),
        });

        let file = File::create(self.manifest_path())?;
        serde_json::to_writer_pretty(BufWriter::new(file), &*manifest)
            .map_err(|e| MitoQcError::Checkpoint(format!("Failed to write manifest: {}", e)))?;
        Ok(())
    }
}

/// In-memory store, for callers that do not need durable checkpoints.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    tables: Mutex<Vec<((usize, usize), KeyedTable)>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn write(&self, stage: usize, job: usize, table: &KeyedTable) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| MitoQcError::Checkpoint("store lock poisoned".to_string()))?;
        tables.retain(|(key, _)| *key != (stage, job));
        tables.push(((stage, job), table.clone()));
        Ok(())
    }

    fn read(&self, stage: usize, job: usize) -> Result<KeyedTable> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| MitoQcError::Checkpoint("store lock poisoned".to_string()))?;
        tables
            .iter()
            .find(|(key, _)| *key == (stage, job))
            .map(|(_, table)| table.clone())
            .ok_or_else(|| {
                MitoQcError::Checkpoint(format!("no checkpoint for stage {} job {}", stage, job))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use mitoqc_core::models::{ElementType, FieldSpec, RowKey, RowKeyKind, Schema, Value};

    #[fixture]
    fn table() -> KeyedTable {
        KeyedTable::from_sample_records(
            Schema::new(
                RowKeyKind::Locus,
                vec![FieldSpec::new("coverage", ElementType::Int32)],
            ),
            "s1",
            vec![(RowKey::locus("chrM", 1), vec![Some(Value::Int32(3))])],
        )
        .unwrap()
    }

    #[rstest]
    fn test_dir_store_paths_and_manifest(table: KeyedTable) {
        let dir = tempfile::tempdir().unwrap();
        let store = DirCheckpointStore::new(dir.path().join("tmp")).unwrap();

        store.write(0, 1, &table).unwrap();
        assert!(dir.path().join("tmp/stage_0_job_1.kt").exists());
        assert_eq!(store.read(0, 1).unwrap(), table);

        store.complete_stage(0, 2).unwrap();
        let text = std::fs::read_to_string(store.manifest_path()).unwrap();
        let manifest: UnionManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(manifest.stages.len(), 1);
        assert_eq!(manifest.stages[0].jobs[1], store.checkpoint_path(0, 1));
    }

    #[rstest]
    fn test_missing_checkpoint_is_checkpoint_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirCheckpointStore::new(dir.path()).unwrap();
        assert!(matches!(store.read(3, 0), Err(MitoQcError::Checkpoint(_))));
    }

    #[rstest]
    fn test_memory_store_overwrites(table: KeyedTable) {
        let store = MemoryCheckpointStore::new();
        store.write(0, 0, &table).unwrap();
        store.write(0, 0, &table).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.read(0, 0).unwrap(), table);
    }
}
