use std::env;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/sebastian.log";

/// `TRACING_LEVEL` wins; otherwise `--verbose` switches from info to debug.
fn filter_directive(verbose: bool) -> String {
    env::var("TRACING_LEVEL").unwrap_or_else(|_| {
        if verbose {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

/// Split `LOG_FILE_PATH` into the folder the appender writes to and the file name.
fn log_location() -> (PathBuf, PathBuf) {
    let path = env::var("LOG_FILE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE));
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sebastian.log"));
    (dir, file)
}

/// Pretty stdout plus a plain-text log file. Keep the guard alive until exit
/// so buffered file lines are flushed.
pub fn init_logger(verbose: bool) -> WorkerGuard {
    let (dir, file) = log_location();
    let dir_error = std::fs::create_dir_all(&dir).err();

    let file_appender = tracing_appender::rolling::never(&dir, &file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .with_line_number(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_ansi(false),
        )
        .with(EnvFilter::new(filter_directive(verbose)))
        .init();

    if let Some(err) = dir_error {
        warn!("Cannot create log folder {}: {}", dir.display(), err);
    }
    info!("Log file: {}", dir.join(&file).display());

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_follows_verbose() {
        if env::var("TRACING_LEVEL").is_err() {
            assert_eq!(filter_directive(false), "info");
            assert_eq!(filter_directive(true), "debug");
        }
    }

    #[test]
    fn test_log_location_splits_path() {
        if env::var("LOG_FILE_PATH").is_err() {
            let (dir, file) = log_location();
            assert_eq!(dir, PathBuf::from("./logs"));
            assert_eq!(file, PathBuf::from("sebastian.log"));
        }
    }
}
