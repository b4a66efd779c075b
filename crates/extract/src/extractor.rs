use chrono::{DateTime, Utc};
use context::{Context, PhaseState, EXTRACT};
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::raw::{RawConversation, RawExport};
use crate::source::Source;
use crate::streaming;

const RAW_DATA_ARTIFACT: &str = "raw_data";

/// Serializable mirror of `RawExport` used only for the checkpoint
/// artifact -- `RawExport.export_date` is a parsed `DateTime`, so this is
/// just a `#[derive(Serialize, Deserialize)]`-able twin rather than a
/// distinct shape.
#[derive(Debug, Serialize, Deserialize)]
struct RawExportArtifact {
    user_id: String,
    export_date: DateTime<Utc>,
    conversations: Vec<RawConversation>,
}

impl From<&RawExport> for RawExportArtifact {
    fn from(export: &RawExport) -> Self {
        Self {
            user_id: export.user_id.clone(),
            export_date: export.export_date,
            conversations: export.conversations.clone(),
        }
    }
}

impl From<RawExportArtifact> for RawExport {
    fn from(artifact: RawExportArtifact) -> Self {
        Self {
            user_id: artifact.user_id,
            export_date: artifact.export_date,
            conversations: artifact.conversations,
        }
    }
}

/// Turns a tar or JSON source into run metadata and a raw conversation
/// stream, per spec §4.2.
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Runs the extract phase, or skips it and loads the prior run's
    /// artifact when `ctx` indicates a resumable checkpoint exists, per
    /// spec §4.2's "Resume" clause.
    pub fn extract(&self, ctx: &Context, source: &Source) -> Result<RawExport, ExtractError> {
        if ctx.can_resume_from_phase(context::TRANSFORM) {
            if let Some(status) = ctx.phases.get_phase_status(EXTRACT) {
                if status.state == PhaseState::Completed && ctx.checkpoint.has_artifact(RAW_DATA_ARTIFACT) {
                    tracing::info!("resuming: skipping extract phase, loading raw_data artifact");
                    let artifact: RawExportArtifact = ctx
                        .checkpoint
                        .read_artifact(RAW_DATA_ARTIFACT)
                        .map_err(|e| ExtractError::MissingMetadata(e.to_string()))?;
                    return Ok(artifact.into());
                }
            }
        }

        ctx.phases.start_phase(EXTRACT, None, None);

        match self.run_extract(ctx, source) {
            Ok(export) => {
                ctx.phases.update_phase_metric(
                    EXTRACT,
                    "conversation_count",
                    serde_json::Value::from(export.conversations.len()),
                );
                ctx.phases.end_phase(EXTRACT, PhaseState::Completed);
                Ok(export)
            }
            Err(err) => {
                ctx.record_error(EXTRACT, err.to_string(), None, true);
                Err(err)
            }
        }
    }

    fn run_extract(&self, ctx: &Context, source: &Source) -> Result<RawExport, ExtractError> {
        let (reader, basename) = source.open()?;

        let mut conversations = Vec::new();
        let meta = streaming::stream_document(reader, |conversation| {
            conversations.push(conversation);
            Ok(())
        })?;

        if !meta.saw_conversations {
            return Err(ExtractError::MissingMetadata("conversations".to_string()));
        }
        let user_id = meta
            .user_id
            .ok_or_else(|| ExtractError::MissingMetadata("userId".to_string()))?;
        let export_date_raw = meta
            .export_date_raw
            .ok_or_else(|| ExtractError::MissingMetadata("exportDate".to_string()))?;
        let export_date = parse_export_date(&export_date_raw)?;

        ctx.set_user_identity(user_id.clone(), None);

        let export = RawExport {
            user_id,
            export_date,
            conversations,
        };

        if !ctx.config.etl.output_dir.is_empty() {
            let dump_name = format!("raw_{basename}");
            if let Err(err) = ctx.checkpoint.write_artifact(&dump_name, &RawExportArtifact::from(&export)) {
                tracing::warn!(error = %err, "failed to write optional raw dump side-file");
            }
            if let Err(err) = ctx.checkpoint.write_artifact(RAW_DATA_ARTIFACT, &RawExportArtifact::from(&export)) {
                tracing::warn!(error = %err, "failed to write raw_data checkpoint artifact");
            }
        }

        Ok(export)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_export_date(raw: &str) -> Result<DateTime<Utc>, ExtractError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ExtractError::MissingMetadata(format!("exportDate is not a valid timestamp: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{AttachmentsConfig, Config, DatabaseConfig, EtlConfig};

    fn test_context(output_dir: std::path::PathBuf) -> Context {
        let config = Config {
            database: DatabaseConfig {
                host: "localhost".into(),
                port: 5432,
                dbname: "test".into(),
                user: "test".into(),
                password: "test".into(),
                connection_timeout: Some(30),
                application_name: None,
            },
            etl: EtlConfig {
                output_dir: output_dir.to_string_lossy().into_owned(),
                memory_limit_mb: 1024,
                parallel_processing: true,
                chunk_size: 1000,
                batch_size: 1000,
                max_workers: Some(2),
            },
            attachments: AttachmentsConfig::default(),
        };
        Context::new(config, uuid::Uuid::new_v4())
    }

    #[test]
    fn extracts_a_flat_shape_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let export_path = dir.path().join("export.json");
        std::fs::write(
            &export_path,
            br#"{
                "userId": "8:alice",
                "exportDate": "2021-06-01T00:00:00Z",
                "conversations": [
                    {"id": "c1", "Properties": {}, "MessageList": [{"from": "8:alice", "messagetype": "RichText", "content": "hi"}]}
                ]
            }"#,
        )
        .unwrap();

        let ctx = test_context(dir.path().to_path_buf());
        let extractor = Extractor::new();
        let export = extractor.extract(&ctx, &Source::from_path(export_path)).unwrap();

        assert_eq!(export.user_id, "8:alice");
        assert_eq!(export.conversations.len(), 1);
        assert_eq!(
            ctx.phases.get_phase_status(EXTRACT).unwrap().state,
            PhaseState::Completed
        );
    }

    #[test]
    fn missing_metadata_fails_the_phase() {
        let dir = tempfile::tempdir().unwrap();
        let export_path = dir.path().join("export.json");
        std::fs::write(&export_path, br#"{"conversations": []}"#).unwrap();

        let ctx = test_context(dir.path().to_path_buf());
        let extractor = Extractor::new();
        let result = extractor.extract(&ctx, &Source::from_path(export_path));

        assert!(result.is_err());
        assert_eq!(
            ctx.phases.get_phase_status(EXTRACT).unwrap().state,
            PhaseState::Failed
        );
    }
}
