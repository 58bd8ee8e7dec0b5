use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::client::error::{ClientError, Result};

const LOG_FILE_NAME: &str = "powerbi-client.log";

/// Configuration for the optional logging subscriber
///
/// The client itself only emits `tracing` events; applications that have no
/// subscriber of their own can install this one.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for console output
    pub console_level: Level,
    /// Log level for file output
    pub file_level: Level,
    /// Directory where log files should be written
    pub log_dir: Option<PathBuf>,
    /// Whether to enable JSON formatted logs for structured output
    pub json_format: bool,
    /// Whether to also log to stderr
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: Level::INFO,
            file_level: Level::DEBUG,
            log_dir: Some(Self::default_log_dir()),
            json_format: false,
            console: false,
        }
    }
}

impl LoggingConfig {
    /// Get the OS-appropriate default log directory
    pub fn default_log_dir() -> PathBuf {
        match ProjectDirs::from("", "", "powerbi-client") {
            // On Linux: ~/.cache/powerbi-client
            Some(proj_dirs) => proj_dirs.cache_dir().to_path_buf(),
            None => PathBuf::from("powerbi-client-logs"),
        }
    }

    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup("POWERBI_LOG_LEVEL").and_then(|l| l.parse::<Level>().ok()) {
            config.console_level = level;
            config.file_level = level;
        }

        if let Some(log_dir) = lookup("POWERBI_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(log_dir));
        }

        if lookup("POWERBI_NO_FILE_LOGS").is_some() {
            config.log_dir = None;
        }

        config.json_format = lookup("POWERBI_JSON_LOGS").is_some();
        config.console = lookup("POWERBI_CONSOLE_LOGS").is_some();

        config
    }
}

/// Install a global subscriber for the given configuration
///
/// The returned guard flushes the file writer when dropped and must be kept
/// alive for as long as logs should be written. Fails if a global subscriber
/// is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    let mut layers = vec![];
    let mut guard = None;

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            ClientError::config(format!("cannot create log directory {}: {e}", log_dir.display()))
        })?;

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(env_filter(config.file_level))
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_filter(env_filter(config.file_level))
                .boxed()
        };

        layers.push(file_layer);
    }

    if config.console {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter(config.console_level))
            .boxed();

        layers.push(console_layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| ClientError::config(format!("failed to install log subscriber: {e}")))?;

    Ok(guard)
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> LoggingConfig {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        LoggingConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.file_level, Level::DEBUG);
        assert!(config.log_dir.is_some());
        assert!(!config.json_format);
        assert!(!config.console);
    }

    #[test]
    fn test_environment_overrides() {
        let config = config_from(&[
            ("POWERBI_LOG_LEVEL", "trace"),
            ("POWERBI_LOG_DIR", "/tmp/powerbi"),
            ("POWERBI_JSON_LOGS", "1"),
            ("POWERBI_CONSOLE_LOGS", "1"),
        ]);

        assert_eq!(config.console_level, Level::TRACE);
        assert_eq!(config.file_level, Level::TRACE);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/powerbi")));
        assert!(config.json_format);
        assert!(config.console);
    }

    #[test]
    fn test_file_logs_can_be_disabled() {
        let config = config_from(&[("POWERBI_LOG_DIR", "/tmp/powerbi"), ("POWERBI_NO_FILE_LOGS", "1")]);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn test_invalid_level_is_ignored() {
        let config = config_from(&[("POWERBI_LOG_LEVEL", "loud")]);
        assert_eq!(config.console_level, Level::INFO);
    }
}
