//! Structured logging setup using tracing.
//!
//! Console output goes to stderr so stdout carries only resolved addresses.

use crate::config::{FileLoggingConfig, LogFormat, LogRotation, LoggingConfig};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Guard that must be kept alive for the duration of the program.
/// When dropped, flushes and closes the file writer.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// What `tidy_log_dir` did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TidyReport {
    pub compressed: usize,
    pub deleted: usize,
}

/// Initialize the logging system based on configuration.
/// Returns a guard that must be kept alive for file logging to work.
pub fn init_logging(config: &LoggingConfig) -> LogGuard {
    if !config.enabled {
        return LogGuard { _file_guard: None };
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console = match config.format {
        LogFormat::Text => fmt::layer().with_writer(io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
    };

    let registry = tracing_subscriber::registry().with(env_filter).with(console);

    match &config.file {
        None => {
            // A subscriber may already be installed (tests, embedding apps)
            let _ = registry.try_init();
            LogGuard { _file_guard: None }
        }
        Some(file_config) => {
            let (file_writer, guard) = create_file_writer(file_config);
            let _ = registry
                .with(fmt::layer().json().with_writer(file_writer))
                .try_init();
            LogGuard {
                _file_guard: Some(guard),
            }
        }
    }
}

fn create_file_writer(
    config: &FileLoggingConfig,
) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
    // Ensure log directory exists
    fs::create_dir_all(&config.log_dir).ok();

    let file_appender =
        RollingFileAppender::new(rotation_of(&config.rotation), &config.log_dir, &config.file_prefix);

    tracing_appender::non_blocking(file_appender)
}

fn rotation_of(rotation: &LogRotation) -> Rotation {
    match rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Gzip rotated log files and delete ones older than `max_age_days`.
///
/// Rotated files carry a date suffix like "dnsprobe.log.2024-01-15"; the
/// active file (bare prefix, or today's suffix) is never touched.
pub fn tidy_log_dir(config: &FileLoggingConfig) -> TidyReport {
    let mut report = TidyReport::default();
    let log_dir = Path::new(&config.log_dir);
    let prefix = config.file_prefix.as_str();

    // tracing-appender names the current file with today's UTC date
    let today = format!("{}{}", prefix, chrono::Utc::now().format(".%Y-%m-%d"));
    let max_age = Duration::from_secs(config.max_age_days * 24 * 60 * 60);

    let entries = match fs::read_dir(log_dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(dir = %log_dir.display(), error = %e, "Failed to read log directory");
            return report;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.starts_with(prefix) => name.to_string(),
            _ => continue,
        };
        if filename == prefix || (filename.starts_with(&today) && !filename.ends_with(".gz")) {
            continue;
        }

        if config.max_age_days > 0 && file_age(&path).is_some_and(|age| age > max_age) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    report.deleted += 1;
                    tracing::info!(path = %path.display(), "Deleted old log file");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete old log file")
                }
            }
            continue;
        }

        if config.compress && !filename.ends_with(".gz") {
            match compress_file(&path) {
                Ok(()) => {
                    report.compressed += 1;
                    tracing::info!(path = %path.display(), "Compressed rotated log file");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to compress log file")
                }
            }
        }
    }

    report
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = path.metadata().ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

/// Compress a single file with gzip and remove the original.
fn compress_file(path: &Path) -> io::Result<()> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".gz");

    let mut reader = BufReader::new(File::open(path)?);
    let writer = BufWriter::new(File::create(&gz_name)?);
    let mut encoder = GzEncoder::new(writer, Compression::default());

    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
}
