// Links in the allocator crate, which sets the global allocator to jemalloc.
extern crate allocator;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use context::Context;
use db::ConnectionPool;
use extract::Source;
use models::{AttachmentsConfig, Config, DatabaseConfig, EtlConfig};
use pipeline::Orchestrator;
use uuid::Uuid;

/// Runs the Skype export ETL pipeline: extract, transform, and load one
/// archive into a PostgreSQL-compatible store.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the export source: a `.json` file or a `.tar` archive
    /// containing one.
    source: PathBuf,

    /// Optional TOML config file providing `[database]`, `[etl]`, and
    /// `[attachments]` sections. Any field it omits falls back to the
    /// matching DB_* environment variable, then to a built-in default.
    #[clap(long = "config")]
    config: Option<PathBuf>,

    /// Resumes a prior run by its task id instead of starting a fresh
    /// one. The task id is also what names the run's checkpoint
    /// directory under `etl.output_dir`.
    #[clap(long = "task-id")]
    task_id: Option<Uuid>,

    /// Directory under which checkpoints and run artifacts are written.
    /// Only used as a fallback when `--config` doesn't set `etl.output_dir`.
    #[clap(long = "output-dir", default_value = "./etl-output")]
    output_dir: String,

    /// Emit structured logs as JSON instead of human-readable text.
    #[clap(long = "json-logs")]
    json_logs: bool,

    #[clap(long = "db-host", env = "DB_HOST")]
    db_host: Option<String>,
    #[clap(long = "db-port", env = "DB_PORT")]
    db_port: Option<u16>,
    #[clap(long = "db-name", env = "DB_NAME")]
    db_name: Option<String>,
    #[clap(long = "db-user", env = "DB_USER")]
    db_user: Option<String>,
    #[clap(long = "db-password", env = "DB_PASSWORD")]
    db_password: Option<String>,
    #[clap(long = "db-application-name", env = "DB_APPLICATION_NAME")]
    db_application_name: Option<String>,
    #[clap(long = "db-connection-timeout", env = "DB_CONNECTION_TIMEOUT")]
    db_connection_timeout: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    ops::init(args.json_logs);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(async_main(args));
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!(error = %err, "pipeline startup failed");
            std::process::exit(1);
        }
    }
}

async fn async_main(args: Args) -> anyhow::Result<i32> {
    let mut config = load_config(&args)?;
    apply_cli_overrides(&mut config, &args);
    config.database = config.database.apply_env_defaults();
    config.validate().context("invalid configuration")?;

    let task_id = args.task_id.unwrap_or_else(Uuid::new_v4);
    let ctx = Context::new(config, task_id);
    tracing::info!(%task_id, source = %args.source.display(), "starting pipeline run");

    let pool = ConnectionPool::connect(&ctx.config.database)
        .await
        .context("failed to connect to the database")?;
    let source = Source::from_path(args.source.clone());
    let file_size = std::fs::metadata(&args.source).map(|m| m.len() as i64).unwrap_or(0);
    let file_source = args.source.to_string_lossy().into_owned();

    let summary = Orchestrator::run(&ctx, &source, &pool, &file_source, file_size).await;
    tracing::info!(
        status = ?summary.status,
        task_id = %summary.task_id,
        conversation_count = summary.conversation_count,
        message_count = summary.message_count,
        "pipeline run finished"
    );
    pool.close_all().await;

    Ok(summary.status.exit_code())
}

/// Loads `Config` from `--config` if given; otherwise builds one from
/// defaults and `--db-*`/`DB_*` alone, with empty-string sentinels on the
/// required database fields so `apply_env_defaults`/`validate` can still
/// catch a genuinely missing field.
fn load_config(args: &Args) -> anyhow::Result<Config> {
    if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?;
        return Ok(config);
    }

    Ok(Config {
        database: DatabaseConfig {
            host: String::new(),
            port: 5432,
            dbname: String::new(),
            user: String::new(),
            password: String::new(),
            connection_timeout: None,
            application_name: None,
        },
        etl: EtlConfig {
            output_dir: args.output_dir.clone(),
            memory_limit_mb: 1024,
            parallel_processing: true,
            chunk_size: 1000,
            batch_size: 1000,
            max_workers: None,
        },
        attachments: AttachmentsConfig::default(),
    })
}

/// CLI flags take precedence over both the config file and the
/// environment: an explicit `--db-host` wins even if `DB_HOST` is also
/// set and the config file names a different host.
fn apply_cli_overrides(config: &mut Config, args: &Args) {
    if let Some(v) = &args.db_host {
        config.database.host = v.clone();
    }
    if let Some(v) = args.db_port {
        config.database.port = v;
    }
    if let Some(v) = &args.db_name {
        config.database.dbname = v.clone();
    }
    if let Some(v) = &args.db_user {
        config.database.user = v.clone();
    }
    if let Some(v) = &args.db_password {
        config.database.password = v.clone();
    }
    if let Some(v) = &args.db_application_name {
        config.database.application_name = Some(v.clone());
    }
    if let Some(v) = args.db_connection_timeout {
        config.database.connection_timeout = Some(v);
    }
    if config.etl.output_dir.is_empty() {
        config.etl.output_dir = args.output_dir.clone();
    }
}
