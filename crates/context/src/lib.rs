//! The run-scoped object threaded through every phase, per spec §4.1.
//! `Context` owns identity (task id, user metadata) and the five
//! sub-managers -- `PhaseManager`, `ProgressTracker`, `MemoryMonitor`,
//! `ErrorLogger`, `CheckpointManager` -- each independently lockable so
//! concurrent chunk workers never contend on unrelated state.

mod checkpoint;
mod errors;
mod memory;
mod phase;
mod progress;

pub use checkpoint::{CheckpointDocument, CheckpointManager};
pub use errors::ErrorLogger;
pub use memory::{MemoryLevel, MemoryMonitor, MemorySnapshot};
pub use phase::{PhaseManager, PhaseState, PhaseStatus, EXTRACT, LOAD, PHASE_ORDER, TRANSFORM};
pub use progress::{ProgressSnapshot, ProgressTracker};

use std::sync::Mutex;

use models::Config;
use uuid::Uuid;

/// Identity fields discovered during extraction and filled in as the run
/// progresses. `user_id`/`user_display_name` come from the export's
/// metadata; `export_id` is assigned by the Loader once the `archives`
/// row is inserted.
#[derive(Debug, Clone, Default)]
pub struct RunIdentity {
    pub user_id: Option<String>,
    pub user_display_name: Option<String>,
    pub export_id: Option<i64>,
}

pub struct Context {
    pub task_id: Uuid,
    pub config: Config,
    identity: Mutex<RunIdentity>,

    pub phases: PhaseManager,
    pub progress: ProgressTracker,
    pub memory: MemoryMonitor,
    pub errors: ErrorLogger,
    pub checkpoint: CheckpointManager,
}

impl Context {
    pub fn new(config: Config, task_id: Uuid) -> Self {
        let run_dir = std::path::Path::new(&config.etl.output_dir).join(task_id.to_string());
        Self {
            task_id,
            memory: MemoryMonitor::new(config.etl.memory_limit_mb),
            checkpoint: CheckpointManager::new(run_dir),
            config,
            identity: Mutex::new(RunIdentity::default()),
            phases: PhaseManager::new(),
            progress: ProgressTracker::new(),
            errors: ErrorLogger::new(),
        }
    }

    /// Rehydrates phase/error state from a prior checkpoint, if one
    /// exists and its version matches this build. Returns `true` if a
    /// checkpoint was found and applied.
    pub fn try_resume(&self) -> anyhow::Result<bool> {
        let Some(doc) = self.checkpoint.load()? else {
            return Ok(false);
        };
        self.phases.restore(doc.phases);
        self.errors.restore(doc.errors);
        self.identity.lock().unwrap().export_id = doc.export_id;
        self.checkpoint.restore_artifacts(doc.artifacts);
        Ok(true)
    }

    pub fn save_checkpoint(&self) -> anyhow::Result<()> {
        let identity = self.identity.lock().unwrap().clone();
        let doc = CheckpointManager::new_document(
            self.task_id,
            identity.export_id,
            self.phases.snapshot(),
            self.errors.errors(),
            self.checkpoint.recorded_artifacts(),
        );
        self.checkpoint.save(&doc)
    }

    pub fn record_error(&self, phase: &str, message: impl Into<String>, details: Option<serde_json::Value>, fatal: bool) {
        self.errors.record_error(&self.phases, phase, message, details, fatal);
    }

    pub fn identity(&self) -> RunIdentity {
        self.identity.lock().unwrap().clone()
    }

    pub fn set_user_identity(&self, user_id: impl Into<String>, display_name: Option<String>) {
        let mut identity = self.identity.lock().unwrap();
        identity.user_id = Some(user_id.into());
        identity.user_display_name = display_name;
    }

    pub fn set_export_id(&self, export_id: i64) {
        self.identity.lock().unwrap().export_id = Some(export_id);
    }

    /// `true` if the run can resume starting at `phase` -- i.e. every
    /// phase before it completed cleanly on a prior attempt.
    pub fn can_resume_from_phase(&self, phase: &str) -> bool {
        self.phases.can_resume_from_phase(phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{AttachmentsConfig, DatabaseConfig, EtlConfig};

    fn test_config(output_dir: String) -> Config {
        Config {
            database: DatabaseConfig {
                host: "localhost".into(),
                port: 5432,
                dbname: "test".into(),
                user: "test".into(),
                password: "test".into(),
                connection_timeout: Some(30),
                application_name: Some("skype-etl".into()),
            },
            etl: EtlConfig {
                output_dir,
                memory_limit_mb: 1024,
                parallel_processing: true,
                chunk_size: 1000,
                batch_size: 1000,
                max_workers: Some(2),
            },
            attachments: AttachmentsConfig::default(),
        }
    }

    #[test]
    fn new_context_starts_with_pending_phases() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(test_config(dir.path().to_string_lossy().into_owned()), Uuid::new_v4());
        assert!(ctx.phases.get_phase_status(EXTRACT).is_some());
        assert!(ctx.identity().export_id.is_none());
    }

    #[test]
    fn checkpoint_round_trips_through_context() {
        let dir = tempfile::tempdir().unwrap();
        let task_id = Uuid::new_v4();
        let output_dir = dir.path().to_string_lossy().into_owned();
        let ctx = Context::new(test_config(output_dir.clone()), task_id);
        ctx.phases.start_phase(EXTRACT, None, None);
        ctx.phases.end_phase(EXTRACT, PhaseState::Completed);
        ctx.set_export_id(42);
        ctx.save_checkpoint().unwrap();

        let resumed = Context::new(test_config(output_dir), task_id);
        assert!(resumed.try_resume().unwrap());
        assert!(resumed.can_resume_from_phase(TRANSFORM));
        assert_eq!(resumed.identity().export_id, Some(42));
    }
}
