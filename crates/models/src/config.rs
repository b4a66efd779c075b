use serde::Deserialize;

use crate::error::PipelineError;

/// `database { host, port, dbname, user, password, connection_timeout?,
/// application_name? }` from spec §6. Every field can instead be supplied
/// via the matching `DB_*` environment variable; `apply_env_defaults`
/// fills in anything the config map left `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub connection_timeout: Option<u64>,
    pub application_name: Option<String>,
}

fn default_pg_port() -> u16 {
    5432
}

impl DatabaseConfig {
    /// Fills in anything left unset from the `DB_*` environment,
    /// matching spec §6's "act as defaults when the config map omits a
    /// field."
    pub fn apply_env_defaults(mut self) -> Self {
        if let Ok(v) = std::env::var("DB_HOST") {
            if self.host.is_empty() {
                self.host = v;
            }
        }
        if let Ok(v) = std::env::var("DB_PORT") {
            if let Ok(port) = v.parse() {
                self.port = port;
            }
        }
        if let Ok(v) = std::env::var("DB_NAME") {
            if self.dbname.is_empty() {
                self.dbname = v;
            }
        }
        if let Ok(v) = std::env::var("DB_USER") {
            if self.user.is_empty() {
                self.user = v;
            }
        }
        if let Ok(v) = std::env::var("DB_PASSWORD") {
            if self.password.is_empty() {
                self.password = v;
            }
        }
        if self.application_name.is_none() {
            self.application_name = std::env::var("DB_APPLICATION_NAME").ok();
        }
        if self.connection_timeout.is_none() {
            self.connection_timeout = std::env::var("DB_CONNECTION_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.host.is_empty() {
            return Err(PipelineError::Validation("database.host is required".into()));
        }
        if self.dbname.is_empty() {
            return Err(PipelineError::Validation("database.dbname is required".into()));
        }
        if self.user.is_empty() {
            return Err(PipelineError::Validation("database.user is required".into()));
        }
        Ok(())
    }

    pub fn connection_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_timeout.unwrap_or(30))
    }
}

/// `etl { output_dir, memory_limit_mb, parallel_processing, chunk_size,
/// batch_size, max_workers? }` from spec §6.
#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
    pub output_dir: String,
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
    #[serde(default = "default_true")]
    pub parallel_processing: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub max_workers: Option<usize>,
}

fn default_memory_limit_mb() -> u64 {
    1024
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    1000
}

fn default_batch_size() -> usize {
    1000
}

impl EtlConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.chunk_size == 0 {
            return Err(PipelineError::Validation("etl.chunk_size must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::Validation("etl.batch_size must be positive".into()));
        }
        if self.memory_limit_mb == 0 {
            return Err(PipelineError::Validation(
                "etl.memory_limit_mb must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
    }
}

/// `attachments { download?, dir?, generate_thumbnails?, extract_metadata?
/// }` from spec §6.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AttachmentsConfig {
    #[serde(default)]
    pub download: bool,
    pub dir: Option<String>,
    #[serde(default)]
    pub generate_thumbnails: bool,
    #[serde(default)]
    pub extract_metadata: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub etl: EtlConfig,
    #[serde(default)]
    pub attachments: AttachmentsConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.database.validate()?;
        self.etl.validate()?;
        Ok(())
    }
}
