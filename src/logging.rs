//! Structured logging setup
//!
//! Logs go to STDERR so that command output on STDOUT stays clean, with an
//! optional copy appended to a file. `RUST_LOG` takes precedence over the
//! configured level.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize logging based on configuration.
///
/// # Arguments
///
/// * `config` - Logging configuration
///
/// # Errors
///
/// Returns an error if the level is not a valid filter directive, the log
/// file cannot be opened, or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use studyflow::config::LoggingConfig;
/// use studyflow::logging::init_logging;
///
/// let config = LoggingConfig::default();
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(&config.level)?);

    if config.json_format {
        let stderr_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);

        if let Some(file_path) = &config.file_path {
            let file_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(Arc::new(open_log_file(file_path)?));
            registry.with(stderr_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stderr_layer).try_init()?;
        }
    } else {
        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);

        if let Some(file_path) = &config.file_path {
            let file_layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(Arc::new(open_log_file(file_path)?));
            registry.with(stderr_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stderr_layer).try_init()?;
        }
    }

    Ok(())
}

/// `RUST_LOG` if set and valid, otherwise `studyflow=<level>`.
fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    Ok(EnvFilter::try_new(format!("studyflow={}", level))?)
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_build_filter_uses_configured_level() {
        std::env::remove_var("RUST_LOG");
        let filter = build_filter("debug").unwrap();
        assert_eq!(filter.to_string(), "studyflow=debug");
    }

    #[test]
    #[serial]
    fn test_build_filter_prefers_rust_log() {
        std::env::set_var("RUST_LOG", "warn");
        let filter = build_filter("debug").unwrap();
        std::env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn test_open_log_file_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("studyflow.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
