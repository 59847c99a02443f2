//! Site configuration loaded from `nexus.toml`.
//!
//! Every field has a default, so a missing file or a partial file is valid.
//! Only unreadable or malformed files are errors.

use crate::countdown::TickGranularity;
use log::info;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "nexus.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Relative paths resolve against the config file's directory.
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CountdownConfig {
    #[serde(default)]
    pub granularity: TickGranularity,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TeamConfig {
    /// Org nodes expanded when the tree view opens.
    #[serde(default = "default_expanded_nodes")]
    pub default_expanded: Vec<String>,
    /// Roster season shown first; `None` shows every season.
    #[serde(default)]
    pub default_year: Option<String>,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            default_expanded: default_expanded_nodes(),
            default_year: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub countdown: CountdownConfig,
    #[serde(default)]
    pub team: TeamConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            logging: LoggingConfig::default(),
            countdown: CountdownConfig::default(),
            team: TeamConfig::default(),
        }
    }
}

impl SiteConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(
                    "event=config_load module=config status=ok source=defaults path={}",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut config = Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        info!(
            "event=config_load module=config status=ok source=file path={}",
            path.display()
        );
        Ok(config)
    }

    /// Rebases relative paths onto `base`.
    pub fn resolve_relative_paths(&mut self, base: &Path) {
        if self.database_path.is_relative() {
            self.database_path = base.join(&self.database_path);
        }
        if self.logging.dir.is_relative() {
            self.logging.dir = base.join(&self.logging.dir);
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config at {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config at {}: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("nexus.db")
}

fn default_log_level() -> String {
    crate::logging::default_log_level().to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_expanded_nodes() -> Vec<String> {
    vec!["board".to_string()]
}
