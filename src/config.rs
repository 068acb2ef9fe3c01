//! Configuration for the heartbeat agent.

use crate::flags::{common_flags, FlagRegistry};
use crate::pipeline::{PipelineSettings, DEFAULT_FLUSH_INTERVAL, DEFAULT_HEARTBEAT_FREQUENCY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the heartbeat agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to wakatime-cli; `~/.wakatime/wakatime-cli` when unset
    pub cli_path: Option<PathBuf>,

    /// API key passed with `--key`
    pub api_key: Option<String>,

    /// Editor and plugin identity passed with `--plugin`
    pub plugin: PluginIdentity,

    /// Language override applied to every heartbeat
    pub language: Option<String>,

    /// Debounce window for repeated activity on one entity
    #[serde(with = "duration_serde")]
    pub heartbeat_frequency: Duration,

    /// How often queued heartbeats are flushed
    #[serde(with = "duration_serde")]
    pub flush_interval: Duration,

    /// Kill wakatime-cli after this many seconds
    pub process_timeout_secs: Option<u64>,

    /// Run wakatime-cli synchronously and log its output
    pub debug: bool,

    /// Default log level (overridden by RUST_LOG)
    pub log_level: String,

    /// Path for storing stats
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wakatime-heartbeat");

        Self {
            cli_path: None,
            api_key: None,
            plugin: PluginIdentity::default(),
            language: None,
            heartbeat_frequency: DEFAULT_HEARTBEAT_FREQUENCY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            process_timeout_secs: None,
            debug: false,
            log_level: "info".to_string(),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wakatime-heartbeat")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    /// Path of the stats file inside the data directory.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    /// Resolved wakatime-cli path.
    pub fn resolved_cli_path(&self) -> PathBuf {
        self.cli_path.clone().unwrap_or_else(default_cli_path)
    }

    /// The configured API key.
    ///
    /// Heartbeats without `--key` fail validation and are dropped before
    /// wakatime-cli runs, so commands that send must check this first.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout_secs.map(Duration::from_secs)
    }

    /// Common flags applied to every heartbeat.
    pub fn common_flags(&self) -> FlagRegistry {
        common_flags(
            self.api_key.as_deref(),
            &self.plugin.user_agent(),
            self.language.as_deref(),
        )
    }

    /// Pipeline timing settings.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            heartbeat_frequency: self.heartbeat_frequency,
            flush_interval: self.flush_interval,
            debug: self.debug,
            ..PipelineSettings::default()
        }
    }
}

/// Default wakatime-cli location, `~/.wakatime/wakatime-cli`.
pub fn default_cli_path() -> PathBuf {
    let binary = if cfg!(windows) {
        "wakatime-cli.exe"
    } else {
        "wakatime-cli"
    };
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".wakatime")
        .join(binary)
}

/// Identity of the editor and plugin reporting heartbeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginIdentity {
    pub editor: String,
    pub editor_version: String,
    pub plugin: String,
    pub plugin_version: String,
}

impl Default for PluginIdentity {
    fn default() -> Self {
        Self {
            editor: "unknown".to_string(),
            editor_version: "0".to_string(),
            plugin: env!("CARGO_PKG_NAME").to_string(),
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl PluginIdentity {
    /// `editor/version plugin/version`, as sent with `--plugin`.
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} {}/{}",
            self.editor, self.editor_version, self.plugin, self.plugin_version
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("no API key configured; set \"api_key\" in the config file")]
    MissingApiKey,
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
