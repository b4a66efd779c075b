use sqlx::{PgPool, Postgres, Transaction};

use crate::error::DbError;

/// Wraps `begin`/`commit`/`rollback` with the retry policy spec §4.6
/// gives to the insertion strategies: on failure, the caller gets the
/// error back and decides whether to retry with a smaller batch: this
/// manager doesn't itself know about batch sizes, only transaction
/// boundaries.
pub struct TransactionManager;

impl TransactionManager {
    pub async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>, DbError> {
        pool.begin().await.map_err(DbError::Transaction)
    }

    pub async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), DbError> {
        tx.commit().await.map_err(DbError::Transaction)
    }

    pub async fn rollback(tx: Transaction<'static, Postgres>) -> Result<(), DbError> {
        tx.rollback().await.map_err(DbError::Transaction)
    }

    /// Runs `f` once; on failure, calls `on_retry` (the caller narrows
    /// its batch size there) and runs `f` exactly one more time. Used by
    /// the Bulk strategy's "halve and retry once" policy (spec §4.6/§7).
    pub async fn retry_once<F, Fut, T>(mut f: F, mut on_retry: impl FnMut()) -> Result<T, DbError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, DbError>>,
    {
        match f().await {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(error = %err, "operation failed, retrying once");
                on_retry();
                f().await
            }
        }
    }
}
