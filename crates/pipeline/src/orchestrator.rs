use anyhow::Context as _;
use context::Context;
use db::{ConnectionPool, Loader};
use extract::{Extractor, Source};
use transform::Transformer;

use crate::summary::{self, RunSummary};

/// Sequences `extract -> transform -> load` in strict order, per spec
/// §4.9. Resume is attempted once up front via `Context::try_resume`;
/// each component then independently decides, via
/// `Context::can_resume_from_phase`, whether to skip its own work and
/// read back a checkpoint artifact instead of rerunning.
pub struct Orchestrator;

impl Orchestrator {
    pub async fn run(ctx: &Context, source: &Source, pool: &ConnectionPool, file_source: &str, file_size: i64) -> RunSummary {
        let resumed = ctx.try_resume().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load checkpoint, starting fresh");
            false
        });
        if resumed {
            tracing::info!(task_id = %ctx.task_id, "resumed prior run from checkpoint");
        }

        let result = Self::run_phases(ctx, source, pool, file_source, file_size).await;
        if let Err(ref err) = result {
            tracing::error!(error = %err, "pipeline run did not complete");
        }

        if let Err(err) = ctx.save_checkpoint() {
            tracing::warn!(error = %err, "failed to save final checkpoint");
        }

        let summary = summary::build(ctx, resumed, result.is_ok());
        if !ctx.config.etl.output_dir.is_empty() {
            if let Err(err) = ctx.checkpoint.write_artifact("etl_summary", &summary) {
                tracing::warn!(error = %err, "failed to write etl_summary artifact");
            }
        }
        summary
    }

    async fn run_phases(
        ctx: &Context,
        source: &Source,
        pool: &ConnectionPool,
        file_source: &str,
        file_size: i64,
    ) -> anyhow::Result<()> {
        let export = Extractor::new().extract(ctx, source).context("extract phase failed")?;
        ctx.save_checkpoint().context("failed to checkpoint after extract")?;

        let transformed = Transformer::new()
            .transform(ctx, &export)
            .await
            .context("transform phase failed")?;
        ctx.save_checkpoint().context("failed to checkpoint after transform")?;

        Loader::load(ctx, pool, file_source, file_size, &transformed)
            .await
            .context("load phase failed")?;
        ctx.save_checkpoint().context("failed to checkpoint after load")?;

        Ok(())
    }
}
