use camino::{Utf8Path, Utf8PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;

/// takes precedence over the configured log level. same syntax as `RUST_LOG`
pub const LOG_ENV: &str = "BURRITO_LOG";
pub const LOG_FILE_NAME: &str = "burrito.log";

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to create log file {path}: {source}")]
    LogFile {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

fn build_filter(from_env: Option<String>, log_level: &str) -> Result<EnvFilter, TraceError> {
    let filter = from_env
        .filter(|filter| !filter.is_empty())
        .unwrap_or_else(|| log_level.to_string());
    EnvFilter::try_new(&filter).map_err(|source| TraceError::Filter { filter, source })
}

/// Logs to stderr, and to `<log_dir>/burrito.log` if a log dir is given.
/// keep the returned guard alive until the end of main, or the last lines of the log file are lost.
pub fn install_tracing(log_level: &str, log_dir: Option<&Utf8Path>) -> Result<Option<WorkerGuard>, TraceError> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter_layer = build_filter(std::env::var(LOG_ENV).ok(), log_level)?;
    let stderr_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(log_dir) => {
            let path = log_dir.join(LOG_FILE_NAME);
            std::fs::create_dir_all(log_dir).map_err(|source| TraceError::LogFile {
                path: path.clone(),
                source,
            })?;
            let writer = std::io::BufWriter::new(
                std::fs::File::create(&path).map_err(|source| TraceError::LogFile { path, source })?,
            );
            let (nb, guard) = tracing_appender::non_blocking(writer);
            let fmt_layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(nb);
            (Some(fmt_layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stderr_layer)
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init()?;
    Ok(guard)
}
