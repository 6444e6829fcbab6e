//! Configuration loading and config file resolution
//!
//! Bootstrap configuration lives in a small TOML file. Everything in it is
//! optional; a missing default file yields built-in defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LESSONGEN_CONFIG";

/// Config file name looked up in the platform config directories
pub const CONFIG_FILE_NAME: &str = "lessongen.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the lesson content REST API (job confirmation, lesson materials)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// URL of the job progress event stream (Server-Sent Events)
    #[serde(default)]
    pub progress_stream_url: Option<String>,

    /// Per-request timeout for REST calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Capacity of the in-process event bus
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Pre-filled generation settings (optional)
    #[serde(default)]
    pub defaults: GenerationDefaults,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Optional defaults copied into the generation settings store at session start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationDefaults {
    pub voice: Option<String>,
    pub language: Option<String>,
    pub speaking_rate: Option<f32>,
    pub destination_folder_id: Option<String>,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_event_bus_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            progress_stream_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            event_bus_capacity: default_event_bus_capacity(),
            logging: LoggingConfig::default(),
            defaults: GenerationDefaults::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the client unusable
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }
        if self.event_bus_capacity == 0 {
            return Err(Error::Config("event_bus_capacity must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Where a resolved config path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    PlatformDefault,
}

/// Config file resolution priority:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config directory (only if the file exists)
///
/// Returns `None` when no file applies and built-in defaults should be used.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
) -> Option<(PathBuf, ConfigSource)> {
    if let Some(path) = cli_arg {
        return Some((path.to_path_buf(), ConfigSource::CommandLine));
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some((PathBuf::from(path), ConfigSource::Environment));
        }
    }

    platform_config_path()
        .filter(|path| path.exists())
        .map(|path| (path, ConfigSource::PlatformDefault))
}

/// Get default configuration file path for the platform
fn platform_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("lessongen").join(CONFIG_FILE_NAME));

    if cfg!(target_os = "linux") {
        // ~/.config/lessongen/lessongen.toml first, then /etc/lessongen/lessongen.toml
        let system_config = PathBuf::from("/etc/lessongen").join(CONFIG_FILE_NAME);
        match user_config {
            Some(path) if path.exists() => Some(path),
            _ if system_config.exists() => Some(system_config),
            other => other,
        }
    } else {
        user_config
    }
}

/// Load configuration following the resolution priority
///
/// An explicitly named file (CLI or environment) must exist; the platform
/// default is only used when present. With no file, defaults apply.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
        Some((path, source)) => {
            info!("Loading configuration from {} ({:?})", path.display(), source);
            load_config_file(&path)
        }
        None => {
            debug!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Read and parse one TOML config file
pub fn load_config_file(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Read config {} failed: {}", path.display(), e))
    })?;
    TomlConfig::from_toml_str(&content)
}

/// Write configuration as TOML, replacing the file atomically
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").expect("empty config should parse");
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.event_bus_capacity, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            api_base_url = "https://lessons.example.edu/api"

            [defaults]
            voice = "vi-VN-Standard-A"
            speaking_rate = 1.25
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.api_base_url, "https://lessons.example.edu/api");
        assert_eq!(config.defaults.voice.as_deref(), Some("vi-VN-Standard-A"));
        assert_eq!(config.defaults.speaking_rate, Some(1.25));
        assert_eq!(config.defaults.language, None);
        assert_eq!(config.event_bus_capacity, 100);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = TomlConfig::from_toml_str("event_bus_capacity = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cli_argument_wins() {
        let (path, source) =
            resolve_config_path(Some(Path::new("/tmp/cli.toml")), "LESSONGEN_TEST_UNSET_VAR")
                .expect("cli path should resolve");
        assert_eq!(path, PathBuf::from("/tmp/cli.toml"));
        assert_eq!(source, ConfigSource::CommandLine);
    }
}
