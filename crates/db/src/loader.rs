use context::{Context, PhaseState, LOAD};
use models::Archive;
use transform::TransformedData;

use crate::error::DbError;
use crate::pool::ConnectionPool;
use crate::schema::SchemaManager;
use crate::strategy::{BulkStrategy, IndividualStrategy, InsertCounts, InsertionStrategy};
use crate::transaction::TransactionManager;

/// Below this message count, the Loader uses the Individual strategy
/// outright (spec §4.6: "used for small inputs, debugging"); at or
/// above it, Bulk is tried first and Individual is the fallback once
/// Bulk's single retry is exhausted.
const SMALL_INPUT_THRESHOLD: usize = 50;

pub struct LoadResult {
    pub export_id: i64,
    pub counts: InsertCounts,
}

/// Sequences the Loader, per spec §4.8: validate -> acquire -> ensure
/// schema -> begin transaction -> insert Archive -> delegate to an
/// Insertion Strategy -> commit -> release -> set `export_id` on
/// `Context`. Rolls back and records a fatal error on any failure.
pub struct Loader;

impl Loader {
    pub async fn load(
        ctx: &Context,
        pool: &ConnectionPool,
        file_source: &str,
        file_size: i64,
        data: &TransformedData,
    ) -> Result<LoadResult, DbError> {
        ctx.phases.start_phase(LOAD, Some(data.conversations.len() as i64), Some(data.metadata.message_count as i64));

        match Self::run_load(ctx, pool, file_source, file_size, data).await {
            Ok(result) => {
                ctx.set_export_id(result.export_id);
                ctx.phases.update_phase_metric(LOAD, "export_id", serde_json::Value::from(result.export_id));
                ctx.phases.end_phase(LOAD, PhaseState::Completed);
                Ok(result)
            }
            Err(err) => {
                ctx.record_error(LOAD, err.to_string(), None, true);
                ctx.phases.end_phase(LOAD, PhaseState::Failed);
                Err(err)
            }
        }
    }

    async fn run_load(
        ctx: &Context,
        pool: &ConnectionPool,
        file_source: &str,
        file_size: i64,
        data: &TransformedData,
    ) -> Result<LoadResult, DbError> {
        SchemaManager::ensure_schema(pool.pool()).await?;

        let (file_source, rewritten) = Archive::normalize_file_source(file_source);
        if rewritten {
            tracing::warn!(file_source, "archive file_source missing .tar extension, normalized");
        }

        let mut tx = TransactionManager::begin(pool.pool()).await?;

        let archive_id: i64 = match sqlx::query_scalar(
            "INSERT INTO archives (task_id, user_id, user_display_name, export_date, file_source, file_size) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(ctx.task_id)
        .bind(&data.user.id)
        .bind(&data.user.display_name)
        .bind(data.metadata.transformed_at)
        .bind(&file_source)
        .bind(file_size)
        .fetch_one(&mut *tx)
        .await
        {
            Ok(id) => id,
            Err(err) => {
                let _ = TransactionManager::rollback(tx).await;
                return Err(DbError::Query(err));
            }
        };

        let total_messages: usize = data.conversations.values().map(|c| c.messages.len()).sum();
        let counts = if total_messages < SMALL_INPUT_THRESHOLD {
            IndividualStrategy.insert(&mut tx, archive_id, data).await
        } else {
            match BulkStrategy::new(ctx.config.etl.batch_size).insert(&mut tx, archive_id, data).await {
                Ok(counts) => Ok(counts),
                Err(err) => {
                    tracing::warn!(error = %err, "bulk insertion failed, falling back to individual strategy");
                    IndividualStrategy.insert(&mut tx, archive_id, data).await
                }
            }
        };

        let counts = match counts {
            Ok(counts) => counts,
            Err(err) => {
                let _ = TransactionManager::rollback(tx).await;
                return Err(err);
            }
        };

        TransactionManager::commit(tx).await?;

        Ok(LoadResult { export_id: archive_id, counts })
    }
}
