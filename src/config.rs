use crate::errors::ConfigError;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "typeweave.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Warn when `expand` replaces a differently-valued feature
    #[serde(default = "default_true")]
    pub warn_on_override: bool,

    /// Turn `redefine` of a finalized feature into a state fault
    #[serde(default = "default_false")]
    pub enforce_final: bool,

    /// Check argument counts against routine arity on `call`
    #[serde(default = "default_true")]
    pub check_arity: bool,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormatSetting,

    #[serde(default = "default_false")]
    pub span_events: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            warn_on_override: true,
            enforce_final: false,
            check_arity: true,
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormatSetting::Pretty,
            span_events: false,
        }
    }
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_level() -> String { "info".to_string() }

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Find and load `typeweave.toml` from the current directory or its parents
    pub fn discover() -> Self {
        let mut current = std::env::current_dir().ok();

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(error) => {
                        tracing::warn!(path = %config_path.display(), %error, "ignoring unreadable config");
                    }
                }
            }
            current = dir.parent().map(|p| p.to_path_buf());
        }

        Self::default()
    }
}

static ACTIVE: Lazy<RwLock<EngineConfig>> = Lazy::new(|| RwLock::new(EngineConfig::default()));

/// Replace the process-wide configuration
pub fn install(config: EngineConfig) {
    tracing::debug!(?config, "installing engine config");
    *ACTIVE.write() = config;
}

/// Snapshot of the process-wide configuration
pub fn current() -> EngineConfig {
    ACTIVE.read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.warn_on_override);
        assert!(!config.enforce_final);
        assert!(config.check_arity);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormatSetting::Pretty);
    }

    #[test]
    fn test_parse_partial_document() {
        let config = EngineConfig::parse(
            r#"
            enforce_final = true

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert!(config.enforce_final);
        assert!(config.warn_on_override);
        assert_eq!(config.logging.format, LogFormatSetting::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        let error = EngineConfig::parse("check_arity = \"yes\"").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "warn_on_override = false").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert!(!config.warn_on_override);

        let missing = EngineConfig::load(Path::new("/nonexistent/typeweave.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }

    #[test]
    #[serial]
    fn test_discover_walks_up_past_unreadable_configs() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join(CONFIG_FILE), "enforce_final = true\ncheck_arity = false\n").unwrap();

        let nested = root.path().join("project").join("src");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join("project").join(CONFIG_FILE), "enforce_final = [").unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(&nested).unwrap();
        let config = EngineConfig::discover();
        std::env::set_current_dir(previous).unwrap();

        assert!(config.enforce_final);
        assert!(!config.check_arity);
        assert!(config.warn_on_override);
    }
}
