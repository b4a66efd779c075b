//! Process-wide `tracing` bootstrap, following `agent/src/main.rs`'s
//! `FmtSubscriber::builder()` pattern: one call at the program boundary,
//! filtered by `RUST_LOG` (defaulting to `info`), with JSON output
//! available for production deployments where logs are shipped to an
//! aggregator, and human-readable pretty output for local development.

/// Installs the global `tracing` subscriber. Panics if a subscriber is
/// already installed, matching the teacher's `expect("setting tracing
/// default failed")` — this is only ever called once, at process start.
pub fn init(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let no_color = matches!(std::env::var("NO_COLOR"), Ok(v) if v == "1");

    if json {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("setting tracing default failed");
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(!no_color)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("setting tracing default failed");
    }
}
