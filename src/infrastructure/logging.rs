//! Logging setup and engine event helpers
//!
//! The engine emits `tracing` events under the `registry`, `conversion`,
//! `instance` and `root` targets. Applications decide where they go by
//! initialising a subscriber through [`init_logging`].

use crate::config::{LogFormatSetting, LoggingSettings};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with timestamps
    Pretty,
    /// Compact format for production
    Compact,
    /// JSON format for structured logging
    Json,
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// File with daily rotation
    File { directory: String, prefix: String },
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    pub span_events: bool,
    /// Extra filter directives (e.g. "typeweave=debug,registry=trace")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Build from the `[logging]` table of the engine configuration
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: Level::from_str(&settings.level).unwrap_or(Level::INFO),
            format: match settings.format {
                LogFormatSetting::Pretty => LogFormat::Pretty,
                LogFormatSetting::Compact => LogFormat::Compact,
                LogFormatSetting::Json => LogFormat::Json,
            },
            span_events: settings.span_events,
            ..Self::default()
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // TYPEWEAVE_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level) = std::env::var("TYPEWEAVE_LOG_LEVEL") {
            config.level = Level::from_str(&level).unwrap_or(Level::INFO);
        }

        // TYPEWEAVE_LOG_FORMAT: pretty, compact, json
        if let Ok(format) = std::env::var("TYPEWEAVE_LOG_FORMAT") {
            config.format = match format.to_lowercase().as_str() {
                "compact" => LogFormat::Compact,
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            };
        }

        // TYPEWEAVE_LOG_FILE: directory for rotated log files
        if let Ok(directory) = std::env::var("TYPEWEAVE_LOG_FILE") {
            config.output = LogOutput::File {
                directory,
                prefix: "typeweave".to_string(),
            };
        }

        config
    }
}

/// Initialize the global logging system
///
/// Returns a `WorkerGuard` that must be kept alive for the duration of the
/// program so that buffered logs are flushed. Only the first call installs a
/// subscriber; later calls return `None`.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    if LOGGER_INITIALIZED.set(()).is_err() {
        return None;
    }

    let filter = build_filter(&config);
    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };

    let layer = format_layer(writer, config.format, config.span_events).with_filter(filter);
    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        tracing::debug!("a global subscriber was already installed");
    }

    Some(guard)
}

fn format_layer<W>(writer: W, format: LogFormat, span_events: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events_config(span_events));

    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let base_filter = EnvFilter::from_default_env().add_directive(config.level.into());

    match &config.filter {
        Some(filter_str) => filter_str.split(',').fold(base_filter, |filter, directive| {
            match directive.parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => {
                    tracing::warn!("Invalid filter directive: {}", directive);
                    filter
                }
            }
        }),
        None => base_filter,
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// Initialize logging with defaults for development
pub fn init_dev_logging() -> Option<WorkerGuard> {
    init_logging(LogConfig {
        level: Level::DEBUG,
        format: LogFormat::Pretty,
        output: LogOutput::Stderr,
        span_events: true,
        filter: Some("typeweave=debug".to_string()),
    })
}

/// Initialize logging with JSON output to rotated files
pub fn init_file_logging(log_dir: impl AsRef<Path>) -> Option<WorkerGuard> {
    init_logging(LogConfig {
        level: Level::INFO,
        format: LogFormat::Json,
        output: LogOutput::File {
            directory: log_dir.as_ref().to_string_lossy().to_string(),
            prefix: "typeweave".to_string(),
        },
        span_events: false,
        filter: None,
    })
}

/// A type was made effective or deferred
#[inline]
pub fn log_type_declared(name: &str, effective: bool) {
    tracing::debug!(target: "registry", name, effective, "type declared");
}

/// `expand` replaced a feature with a different value
#[inline]
pub fn log_feature_override(name: &str, key: &str) {
    tracing::warn!(target: "registry", name, key, "feature is redefined by inheritance");
}

/// `redefine` touched a feature marked final
#[inline]
pub fn log_final_redefined(name: &str, key: &str) {
    tracing::warn!(target: "registry", name, key, "final feature redefined");
}

#[inline]
pub fn log_inheritance(heir: &str, parent: &str) {
    tracing::debug!(target: "registry", heir, parent, "inheritance added");
}

#[inline]
pub fn log_conversion_registered(name: &str, key: &str, abstraction: &str, command: bool) {
    tracing::debug!(target: "conversion", name, key, abstraction, command, "conversion registered");
}

#[inline]
pub fn log_conversion_resolved(target_type: &str, key: &str, command: bool) {
    tracing::trace!(target: "conversion", target_type, key, command, "conversion resolved");
}

#[inline]
pub fn log_allocation(generator: &str) {
    tracing::trace!(target: "instance", generator, "instance allocated");
}

/// An instance was duplicated through `twin_of` / `deep_twin_of`
#[inline]
pub fn log_twin(generator: &str, deep: bool, overridden: bool) {
    tracing::trace!(target: "root", generator, deep, overridden, "twin created");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const LOG_VARS: [&str; 3] = ["TYPEWEAVE_LOG_LEVEL", "TYPEWEAVE_LOG_FORMAT", "TYPEWEAVE_LOG_FILE"];

    #[test]
    fn test_config_builder() {
        let config = LogConfig::new()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_span_events(true)
            .with_filter("typeweave=trace");

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.span_events);
        assert_eq!(config.filter, Some("typeweave=trace".to_string()));
    }

    #[test]
    fn test_from_settings() {
        let settings = LoggingSettings {
            level: "warn".to_string(),
            format: LogFormatSetting::Compact,
            span_events: true,
        };
        let config = LogConfig::from_settings(&settings);
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.span_events);
        assert_eq!(config.output, LogOutput::Stderr);

        let fallback = LogConfig::from_settings(&LoggingSettings {
            level: "loud".to_string(),
            ..LoggingSettings::default()
        });
        assert_eq!(fallback.level, Level::INFO);
    }

    #[test]
    fn test_event_helpers() {
        // These should not panic without a subscriber
        log_type_declared("Point", true);
        log_feature_override("Point", "x");
        log_final_redefined("Point", "x");
        log_inheritance("Point", "Any");
        log_conversion_registered("Point", "to_pair", "Pair", false);
        log_conversion_resolved("Pair", "to_pair", false);
        log_allocation("Point");
        log_twin("Point", true, false);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("TYPEWEAVE_LOG_LEVEL", "debug");
        std::env::set_var("TYPEWEAVE_LOG_FORMAT", "JSON");
        std::env::set_var("TYPEWEAVE_LOG_FILE", "/var/log/typeweave");
        let config = LogConfig::from_env();
        for var in LOG_VARS {
            std::env::remove_var(var);
        }

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(
            config.output,
            LogOutput::File {
                directory: "/var/log/typeweave".to_string(),
                prefix: "typeweave".to_string(),
            }
        );
    }

    #[test]
    #[serial]
    fn test_from_env_falls_back_on_unknown_values() {
        for var in LOG_VARS {
            std::env::remove_var(var);
        }
        std::env::set_var("TYPEWEAVE_LOG_LEVEL", "chatty");
        std::env::set_var("TYPEWEAVE_LOG_FORMAT", "xml");
        let config = LogConfig::from_env();
        for var in LOG_VARS {
            std::env::remove_var(var);
        }

        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn test_only_first_initialisation_installs() {
        let _guard = init_logging(LogConfig::new().with_level(Level::ERROR).with_format(LogFormat::Compact));

        assert!(init_logging(LogConfig::default()).is_none());
        assert!(init_dev_logging().is_none());
        assert!(LOGGER_INITIALIZED.get().is_some());
    }
}
