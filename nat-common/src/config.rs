//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `NAT_CONFIG` environment variable
//! 3. `~/.config/nat/config.toml` (platform config directory)
//! 4. Compiled defaults
//!
//! A missing file is not an error: the defaults are used and the caller
//! reports it as a warning. A file that exists but cannot be parsed is an
//! error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::articles::SelectionStrategy;
use crate::selection::{SelectionBounds, DEFAULT_MAX_WORDS, DEFAULT_MIN_WORDS};
use crate::session::SessionSettings;
use crate::sink::SinkConfig;
use crate::survey::RationaleRule;
use crate::taxonomy::{Taxonomy, TaxonomyVersion};
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "NAT_CONFIG";

/// Default HTTP port of the annotation service
pub const DEFAULT_PORT: u16 = 5730;

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Resolved path does not exist; defaults in use
    Missing(PathBuf),
    /// No config directory on this platform; defaults in use
    NoConfigDir,
}

impl ConfigSource {
    /// Log the source at the appropriate level
    pub fn report(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file {} not found, using default configuration",
                path.display()
            ),
            ConfigSource::NoConfigDir => {
                warn!("No config directory available, using default configuration")
            }
        }
    }
}

/// Root of the TOML bootstrap file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_address: String,
    pub port: u16,
    /// Production mode hides the diagnostic export endpoint
    pub production: bool,
    pub dataset: DatasetConfig,
    pub annotation: AnnotationConfig,
    pub sink: SinkConfig,
    pub sessions: RetentionConfig,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            production: false,
            dataset: DatasetConfig::default(),
            annotation: AnnotationConfig::default(),
            sink: SinkConfig::default(),
            sessions: RetentionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// CSV file with `Headline` and `News body` columns
    pub path: PathBuf,
    pub strategy: SelectionStrategy,
    /// Seed for random selection; unseeded when absent
    pub seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/articles.csv"),
            strategy: SelectionStrategy::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub min_words: usize,
    pub max_words: usize,
    pub taxonomy: TaxonomyVersion,
    pub rationale_rule: RationaleRule,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
            max_words: DEFAULT_MAX_WORDS,
            taxonomy: TaxonomyVersion::default(),
            rationale_rule: RationaleRule::default(),
        }
    }
}

/// How long the service keeps sessions in memory
///
/// Production services drop a session as soon as it finishes; the finished
/// TTL only applies while the diagnostic export is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Unfinished sessions untouched for this long are dropped
    pub idle_timeout_secs: u64,
    /// Finished sessions are kept this long for export
    pub finished_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 2 * 60 * 60,
            finished_ttl_secs: 15 * 60,
            sweep_interval_secs: 60,
        }
    }
}

impl RetentionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn finished_ttl(&self) -> Duration {
        Duration::from_secs(self.finished_ttl_secs)
    }

    /// Sweep period; zero is rejected since a timer cannot tick at that rate
    pub fn sweep_interval(&self) -> Result<Duration> {
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "sessions.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.sweep_interval_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolve and load the config file, falling back to defaults if it is missing
    ///
    /// Nothing is logged here since the log level itself comes from the
    /// result; callers report the returned [`ConfigSource`] once tracing is up.
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => {
                let config = Self::load(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            Some(path) => Ok((Self::default(), ConfigSource::Missing(path))),
            None => Ok((Self::default(), ConfigSource::NoConfigDir)),
        }
    }

    /// `host:port` to bind the service to
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Validation rules for new sessions
    pub fn session_settings(&self) -> Result<SessionSettings> {
        let annotation = &self.annotation;
        if annotation.rationale_rule.minimum() == 0 {
            warn!("Rationale rule minimum is 0; every rationale will be accepted");
        }
        Ok(SessionSettings {
            bounds: SelectionBounds::new(annotation.min_words, annotation.max_words)?,
            taxonomy: Taxonomy::new(annotation.taxonomy),
            rationale_rule: annotation.rationale_rule,
        })
    }
}

/// Config file path by priority: CLI argument, environment, platform default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// `<config dir>/nat/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nat").join("config.toml"))
}
