use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_ENV: &str = "DOCPEEK_LOG";
const LOG_DIRNAME: &str = "log";
const LOG_FILE_PREFIX: &str = "docpeek.log";
const DEFAULT_FILTER: &str = "warn";

/// Sends `tracing` output to a daily log file under `home/log`, leaving
/// stdout and stderr to the command. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(home: &Path) -> Result<WorkerGuard> {
    let dir = home.join(LOG_DIRNAME);
    fs::create_dir_all(&dir).with_context(|| format!("create log dir {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;
    Ok(guard)
}
