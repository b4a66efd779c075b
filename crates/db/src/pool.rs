use std::time::Duration;

use models::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::error::DbError;

const MIN_CONNECTIONS: u32 = 1;
const MAX_CONNECTIONS: u32 = 10;
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub in_use: u32,
}

/// Thin wrapper around `sqlx::PgPool`, per spec §4.5 -- `sqlx::PgPool`
/// already implements the idle/max-age eviction and validate-on-release
/// semantics the spec describes, so this exists only to narrow the
/// surface the rest of the pipeline depends on to `{acquire, stats}`
/// rather than `sqlx` directly, and to map `acquire`'s timeout onto
/// `DbError::PoolExhausted`.
pub struct ConnectionPool {
    pool: PgPool,
}

impl ConnectionPool {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.user)
            .password(&config.password);
        if let Some(name) = &config.application_name {
            options = options.application_name(name);
        }

        let pool = PgPoolOptions::new()
            .min_connections(MIN_CONNECTIONS)
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(config.connection_timeout())
            .idle_timeout(IDLE_TIMEOUT)
            .max_lifetime(MAX_LIFETIME)
            .connect_with(options)
            .await
            .map_err(DbError::Query)?;

        Ok(Self { pool })
    }

    /// Acquires a connection, bounded by the pool's `acquire_timeout`.
    /// The returned guard releases (and, per `sqlx`, validates) the
    /// connection on drop.
    pub async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, DbError> {
        self.pool.acquire().await.map_err(|err| match err {
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted {
                waited_secs: self.pool.options().get_acquire_timeout().as_secs(),
            },
            other => DbError::Query(other),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            in_use: self.pool.size().saturating_sub(self.pool.num_idle() as u32),
        }
    }

    pub async fn close_all(&self) {
        self.pool.close().await;
    }
}
