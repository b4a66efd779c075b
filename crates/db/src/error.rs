/// Database-specific failure kinds, per spec §4.5-4.8. All variants are
/// fatal to whichever of them they occur in; the Loader converts them to
/// `models::PipelineError::Database`/`Resource` at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("connection pool exhausted after waiting {waited_secs}s")]
    PoolExhausted { waited_secs: u64 },

    #[error("schema setup failed: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Query(#[source] sqlx::Error),

    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Query(err)
    }
}

impl From<DbError> for models::PipelineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::PoolExhausted { .. } => models::PipelineError::Resource(err.to_string()),
            other => models::PipelineError::Database(Box::new(other)),
        }
    }
}
