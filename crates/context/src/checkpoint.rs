use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use models::ErrorRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::phase::PhaseStatus;

const CHECKPOINT_VERSION: u32 = 1;
const CHECKPOINT_FILE: &str = "checkpoint.json";

/// Everything needed to resume a run, per spec §6. Sidecar artifacts
/// (`raw_data`, `transformed_data`, `etl_summary`) are written separately
/// by the extract/transform/orchestrator phases under the same run
/// directory; `artifacts` records each one's on-disk path as of this
/// checkpoint, per invariant 6's "referenced on disk at the recorded
/// path."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointDocument {
    pub checkpoint_version: u32,
    pub task_id: Uuid,
    pub export_id: Option<i64>,
    pub phases: HashMap<String, PhaseStatus>,
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub artifacts: HashMap<String, String>,
}

/// Reads and writes the checkpoint document for a single run, scoped to
/// `run_dir` (typically `<etl.output_dir>/<task_id>/`). Resume is only
/// attempted when the on-disk `checkpoint_version` matches this build's,
/// per spec §6's "a version mismatch is treated as if no checkpoint
/// exists."
pub struct CheckpointManager {
    run_dir: PathBuf,
    /// Name -> on-disk path of every artifact written (or restored from a
    /// prior checkpoint) this run, so `Context::save_checkpoint` can
    /// record where each one actually lives, per spec invariant 6.
    artifacts: Mutex<HashMap<String, String>>,
}

impl CheckpointManager {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            artifacts: Mutex::new(HashMap::new()),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.run_dir.join(format!("{name}.json"))
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.run_dir.join(CHECKPOINT_FILE)
    }

    pub fn save(&self, doc: &CheckpointDocument) -> anyhow::Result<()> {
        fs::create_dir_all(&self.run_dir)?;
        let bytes = serde_json::to_vec_pretty(doc)?;
        let path = self.checkpoint_path();
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &path)?;
        tracing::info!(task_id = %doc.task_id, path = %path.display(), "checkpoint saved");
        Ok(())
    }

    /// Returns `None` if no checkpoint exists, or if one exists but its
    /// version doesn't match this build -- both are treated as "start
    /// fresh" by the orchestrator.
    pub fn load(&self) -> anyhow::Result<Option<CheckpointDocument>> {
        let path = self.checkpoint_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let doc: CheckpointDocument = match serde_json::from_slice(&bytes) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "checkpoint unreadable, ignoring");
                return Ok(None);
            }
        };
        if doc.checkpoint_version != CHECKPOINT_VERSION {
            tracing::warn!(
                found = doc.checkpoint_version,
                expected = CHECKPOINT_VERSION,
                "checkpoint version mismatch, ignoring"
            );
            return Ok(None);
        }
        Ok(Some(doc))
    }

    pub fn write_artifact<T: Serialize>(&self, name: &str, value: &T) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.run_dir)?;
        let path = self.artifact_path(name);
        let bytes = serde_json::to_vec(value)?;
        fs::write(&path, bytes)?;
        self.artifacts.lock().unwrap().insert(name.to_string(), path.display().to_string());
        Ok(path)
    }

    pub fn read_artifact<T: for<'de> Deserialize<'de>>(&self, name: &str) -> anyhow::Result<T> {
        let path = self.artifact_path(name);
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn has_artifact(&self, name: &str) -> bool {
        self.artifact_path(name).exists()
    }

    /// Artifacts recorded so far this run, by name -> on-disk path,
    /// including any restored via `restore_artifacts` on resume.
    pub fn recorded_artifacts(&self) -> HashMap<String, String> {
        self.artifacts.lock().unwrap().clone()
    }

    /// Merges a prior checkpoint's artifact paths back in on resume, so
    /// phases that are skipped this run (because their artifact already
    /// exists on disk) don't drop their path reference from the next
    /// checkpoint write.
    pub fn restore_artifacts(&self, artifacts: HashMap<String, String>) {
        self.artifacts.lock().unwrap().extend(artifacts);
    }

    pub fn new_document(
        task_id: Uuid,
        export_id: Option<i64>,
        phases: HashMap<String, PhaseStatus>,
        errors: Vec<ErrorRecord>,
        artifacts: HashMap<String, String>,
    ) -> CheckpointDocument {
        CheckpointDocument {
            checkpoint_version: CHECKPOINT_VERSION,
            task_id,
            export_id,
            phases,
            errors,
            artifacts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let task_id = Uuid::new_v4();
        let doc = CheckpointManager::new_document(task_id, None, HashMap::new(), Vec::new(), HashMap::new());

        manager.save(&doc).unwrap();
        let loaded = manager.load().unwrap().unwrap();
        assert_eq!(loaded.task_id, task_id);
    }

    #[test]
    fn missing_checkpoint_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        assert!(manager.load().unwrap().is_none());
    }

    #[test]
    fn version_mismatch_is_treated_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let mut doc = CheckpointManager::new_document(Uuid::new_v4(), None, HashMap::new(), Vec::new(), HashMap::new());
        doc.checkpoint_version = 99;
        manager.save(&doc).unwrap();
        assert!(manager.load().unwrap().is_none());
    }

    #[test]
    fn round_trips_an_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let value = serde_json::json!({"hello": "world"});
        manager.write_artifact("raw_data", &value).unwrap();
        assert!(manager.has_artifact("raw_data"));
        let read: Value = manager.read_artifact("raw_data").unwrap();
        assert_eq!(read, value);
    }

    #[test]
    fn writing_an_artifact_records_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let path = manager.write_artifact("raw_data", &serde_json::json!({"a": 1})).unwrap();

        let recorded = manager.recorded_artifacts();
        assert_eq!(recorded.get("raw_data").unwrap(), &path.display().to_string());
    }

    #[test]
    fn restored_artifacts_survive_into_the_next_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let mut artifacts = HashMap::new();
        artifacts.insert("transformed_data".to_string(), "/tmp/run/transformed_data.json".to_string());
        manager.restore_artifacts(artifacts);

        let recorded = manager.recorded_artifacts();
        assert_eq!(recorded.get("transformed_data").unwrap(), "/tmp/run/transformed_data.json");
    }
}
