use std::collections::HashMap;
use std::sync::Arc;

use context::{Context, PhaseState, LOAD, TRANSFORM};
use extract::RawExport;
use models::Conversation;
use tokio::sync::Semaphore;

use crate::chunk::{build_participants, process_chunk};
use crate::content::ContentExtractor;
use crate::error::TransformError;
use crate::output::{
    conversation_type_from_raw, ConversationMetadata, TransformMetadata, TransformedConversation, TransformedData,
    TransformedUser,
};
use handlers::Factory;

const TRANSFORMED_DATA_ARTIFACT: &str = "transformed_data";

/// Normalizes a `RawExport` into `TransformedData`, per spec §4.4. Holds
/// the handler registry and content extractor behind `Arc` so chunk
/// workers can own a cheap clone across the `spawn_blocking` boundary,
/// which requires `'static` closures.
pub struct Transformer {
    factory: Arc<Factory>,
    extractor: Arc<ContentExtractor>,
}

impl Transformer {
    pub fn new() -> Self {
        Self {
            factory: Arc::new(Factory::new()),
            extractor: Arc::new(ContentExtractor::new()),
        }
    }

    /// Runs the transform phase, or skips it and loads the prior run's
    /// artifact when `ctx` indicates a resumable checkpoint exists, per
    /// spec §4.4's "Resume" clause.
    pub async fn transform(&self, ctx: &Context, export: &RawExport) -> Result<TransformedData, TransformError> {
        if ctx.can_resume_from_phase(LOAD) {
            if let Some(status) = ctx.phases.get_phase_status(TRANSFORM) {
                if status.state == PhaseState::Completed && ctx.checkpoint.has_artifact(TRANSFORMED_DATA_ARTIFACT) {
                    tracing::info!("resuming: skipping transform phase, loading transformed_data artifact");
                    return ctx
                        .checkpoint
                        .read_artifact(TRANSFORMED_DATA_ARTIFACT)
                        .map_err(|e| TransformError::Checkpoint(e.to_string()));
                }
            }
        }

        let total_conversations = export.conversations.len() as i64;
        let total_messages: i64 = export.conversations.iter().map(|c| c.message_list.len() as i64).sum();
        ctx.phases.start_phase(TRANSFORM, Some(total_conversations), Some(total_messages));

        match self.run_transform(ctx, export).await {
            Ok(data) => {
                ctx.phases.update_phase_metric(
                    TRANSFORM,
                    "conversation_count",
                    serde_json::Value::from(data.conversations.len()),
                );
                ctx.phases
                    .update_phase_metric(TRANSFORM, "message_count", serde_json::Value::from(data.metadata.message_count));
                ctx.phases.end_phase(TRANSFORM, PhaseState::Completed);

                if !ctx.config.etl.output_dir.is_empty() {
                    if let Err(err) = ctx.checkpoint.write_artifact(TRANSFORMED_DATA_ARTIFACT, &data) {
                        tracing::warn!(error = %err, "failed to write transformed_data checkpoint artifact");
                    }
                }

                Ok(data)
            }
            Err(err) => {
                ctx.phases.end_phase(TRANSFORM, PhaseState::Failed);
                Err(err)
            }
        }
    }

    async fn run_transform(&self, ctx: &Context, export: &RawExport) -> Result<TransformedData, TransformError> {
        let chunk_size = ctx.config.etl.chunk_size.max(1);
        let parallel = ctx.config.etl.parallel_processing;
        let semaphore = Arc::new(Semaphore::new(ctx.config.etl.max_workers().max(1)));

        let total_messages: u64 = export.conversations.iter().map(|c| c.message_list.len() as u64).sum();
        let mut messages_done: u64 = 0;

        let mut conversations = HashMap::with_capacity(export.conversations.len());

        for conv in &export.conversations {
            let (participants, lookup) = build_participants(conv, &export.user_id);
            let lookup = Arc::new(lookup);

            let chunks: Vec<Vec<extract::RawMessage>> =
                conv.message_list.chunks(chunk_size).map(|c| c.to_vec()).collect();

            let mut messages = if parallel && chunks.len() > 1 {
                self.process_chunks_parallel(ctx, &conv.id, chunks, &lookup, &semaphore).await?
            } else {
                let mut out = Vec::with_capacity(conv.message_list.len());
                for chunk in chunks {
                    out.extend(process_chunk(&chunk, &self.factory, &self.extractor, &conv.id, &lookup));
                }
                out
            };

            messages.sort_by_key(|m| m.timestamp);

            messages_done += messages.len() as u64;
            ctx.progress.update_progress(messages_done, total_messages);

            let first_message_time = messages.first().map(|m| m.timestamp);
            let last_message_time = messages.last().map(|m| m.timestamp);
            let message_count = messages.len() as i64;
            let participant_count = participants.len() as i64;

            let conversation = Conversation {
                id: conv.id.clone(),
                display_name: conv.properties.display_name.clone().unwrap_or_default(),
                conversation_type: conversation_type_from_raw(conv.properties.conversation_type.as_deref()),
                export_id: None,
                first_message_time,
                last_message_time,
                message_count,
                participant_count,
            };

            conversations.insert(
                conv.id.clone(),
                TransformedConversation {
                    conversation,
                    participants,
                    messages,
                    metadata: ConversationMetadata {
                        message_count,
                        participant_count,
                    },
                },
            );
        }

        let message_count = conversations.values().map(|c| c.messages.len()).sum();
        let conversation_count = conversations.len();

        Ok(TransformedData {
            user: TransformedUser {
                id: export.user_id.clone(),
                display_name: None,
            },
            conversations,
            metadata: TransformMetadata {
                transformed_at: chrono::Utc::now(),
                conversation_count,
                message_count,
            },
        })
    }

    /// Dispatches one `spawn_blocking` task per chunk, bounded by
    /// `semaphore` (sized to `etl.max_workers`). Blocking closures only
    /// close over `Arc`-shared, owned data -- never `ctx` itself, since
    /// `spawn_blocking` requires `'static`. Per-chunk join failures are
    /// the only way this returns `Err`; per-message failures are already
    /// handled (and logged) inside `process_chunk`.
    async fn process_chunks_parallel(
        &self,
        ctx: &Context,
        conversation_id: &str,
        chunks: Vec<Vec<extract::RawMessage>>,
        lookup: &Arc<HashMap<String, String>>,
        semaphore: &Arc<Semaphore>,
    ) -> Result<Vec<models::Message>, TransformError> {
        let mut handles = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let factory = Arc::clone(&self.factory);
            let extractor = Arc::clone(&self.extractor);
            let lookup = Arc::clone(lookup);
            let conversation_id = conversation_id.to_string();
            let permit = Arc::clone(semaphore)
                .acquire_owned()
                .await
                .map_err(|e| TransformError::ChunkWorker(e.to_string()))?;

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                process_chunk(&chunk, &factory, &extractor, &conversation_id, &lookup)
            }));
        }

        let mut out = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(chunk_messages) => out.extend(chunk_messages),
                Err(join_err) => {
                    let reason = join_err.to_string();
                    ctx.record_error(TRANSFORM, format!("chunk worker panicked: {reason}"), None, true);
                    return Err(TransformError::ChunkWorker(reason));
                }
            }
        }
        Ok(out)
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{RawConversation, RawConversationProperties, RawMessage, RawParticipant};
    use models::{AttachmentsConfig, Config, DatabaseConfig, EtlConfig};

    fn test_context(output_dir: std::path::PathBuf, chunk_size: usize, parallel: bool) -> Context {
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
                parallel_processing: parallel,
                chunk_size,
                batch_size: 1000,
                max_workers: Some(2),
            },
            attachments: AttachmentsConfig::default(),
        };
        Context::new(config, uuid::Uuid::new_v4())
    }

    fn raw_message(id: &str, minute: u32) -> RawMessage {
        RawMessage {
            id: Some(id.to_string()),
            originalarrivaltime: Some(format!("2021-06-01T00:{minute:02}:00Z")),
            from: Some("8:alice".to_string()),
            sender_display_name: None,
            content: "<p>hi</p>".to_string(),
            messagetype: Some("RichText".to_string()),
            edittime: None,
            properties: serde_json::Value::Null,
        }
    }

    fn sample_export(message_count: u32) -> RawExport {
        let message_list = (0..message_count).map(|i| raw_message(&i.to_string(), i)).collect();
        RawExport {
            user_id: "8:alice".into(),
            export_date: chrono::Utc::now(),
            conversations: vec![RawConversation {
                id: "conv1".into(),
                properties: RawConversationProperties {
                    conversation_type: Some("OneToOne".into()),
                    display_name: Some("Alice & Bob".into()),
                    participants: vec![
                        RawParticipant { mri: "8:alice".into(), display_name: Some("Alice".into()) },
                        RawParticipant { mri: "8:bob".into(), display_name: Some("Bob".into()) },
                    ],
                    creation_time: None,
                    last_updated_time: None,
                },
                message_list,
            }],
        }
    }

    #[tokio::test]
    async fn transforms_and_sorts_messages_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path().to_path_buf(), 1000, false);
        let export = sample_export(5);

        let transformer = Transformer::new();
        let data = transformer.transform(&ctx, &export).await.unwrap();

        let conv = data.conversations.get("conv1").unwrap();
        assert_eq!(conv.messages.len(), 5);
        assert!(conv.messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(
            ctx.phases.get_phase_status(context::TRANSFORM).unwrap().state,
            context::PhaseState::Completed
        );
    }

    #[tokio::test]
    async fn transforms_in_parallel_and_still_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path().to_path_buf(), 2, true);
        let export = sample_export(9);

        let transformer = Transformer::new();
        let data = transformer.transform(&ctx, &export).await.unwrap();

        let conv = data.conversations.get("conv1").unwrap();
        assert_eq!(conv.messages.len(), 9);
        assert!(conv.messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn resumes_from_a_completed_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path().to_path_buf(), 1000, false);
        let export = sample_export(3);

        ctx.phases.start_phase(context::EXTRACT, None, None);
        ctx.phases.end_phase(context::EXTRACT, context::PhaseState::Completed);

        let transformer = Transformer::new();
        let first = transformer.transform(&ctx, &export).await.unwrap();

        ctx.phases.start_phase(context::LOAD, None, None);
        ctx.phases.end_phase(context::LOAD, context::PhaseState::Failed);

        let resumed = transformer.transform(&ctx, &RawExport {
            user_id: export.user_id.clone(),
            export_date: export.export_date,
            conversations: Vec::new(),
        })
        .await
        .unwrap();

        assert_eq!(resumed.metadata.message_count, first.metadata.message_count);
    }
}
