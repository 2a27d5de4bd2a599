// SPDX-License-Identifier: MIT
use anyhow::Result;
use clap::Parser;
use skeind::{config::SkeinConfig, rest, AppContext};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "skeind", about = "SKEIN — multi-tenant collaboration substrate for autonomous agents", version)]
struct Args {
    /// HTTP port to listen on
    #[arg(long, env = "SKEIN_PORT")]
    port: Option<u16>,

    /// Interface to bind
    #[arg(long, env = "SKEIN_HOST")]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SKEIN_LOG")]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "SKEIN_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,

    /// Path to config.toml. Defaults to `~/.skein/config.toml`.
    #[arg(long, env = "SKEIN_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Path to the project registry file. Defaults to `~/.skein/projects.json`.
    #[arg(long, env = "SKEIN_REGISTRY_PATH")]
    registry_path: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log.clone().unwrap_or_else(|| "info".to_string());
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref());

    let config = SkeinConfig::load(args.port, args.host, args.log, args.config, args.registry_path);
    info!(host = %config.host, port = config.port, "starting skeind");

    let ctx = Arc::new(AppContext::new(config));
    rest::start_server(ctx).await
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(log_level: &str, log_file: Option<&std::path::Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("skeind.log"));

        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("warn: could not create log directory '{}': {e} — falling back to stdout", dir.display());
            tracing_subscriber::fmt().with_env_filter(log_level.to_string()).compact().init();
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(log_level.to_string()))
            .with(tracing_subscriber::fmt::layer().compact())
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .init();

        Some(guard)
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level.to_string()).compact().init();
        None
    }
}
