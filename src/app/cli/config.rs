//! TOML configuration file loading
//!
//! Values are merged in this order, later wins: built-in defaults, the
//! configuration file, command line flags.
//!
//! ```toml
//! [loop]
//! drain_timeout_ms = 5000
//!
//! [demo]
//! producers = 4
//! messages = 250
//! observers = 3
//! exit_code = 0
//!
//! [log]
//! level = "debug"
//! ```
//!
//! Logging starts from the command line before this file is read, so only
//! the `[log]` level can be changed here; format and output target are
//! command line options.

use super::args::Args;
use crate::app::demo::DemoSettings;
use crate::core::error_handling::ContextualError;
use crate::message_loop::api::LoopConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Error reading configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. } | ConfigError::Invalid { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::NotFound { .. } => {
                Some("the file named by --config-file does not exist")
            }
            ConfigError::Invalid { message } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoFileConfig {
    pub producers: Option<usize>,
    pub messages: Option<usize>,
    pub observers: Option<usize>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogFileConfig {
    pub level: Option<String>,
}

/// Contents of `loopbus.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    #[serde(rename = "loop")]
    pub loop_config: LoopConfig,
    pub demo: DemoFileConfig,
    pub log: LogFileConfig,
}

impl FileConfig {
    /// `<config dir>/loopbus/loopbus.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("loopbus").join("loopbus.toml"))
    }

    /// Load the explicit file, or the default file when it exists
    ///
    /// An explicitly named file must exist; a missing default file just
    /// yields the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) if !path.exists() => Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            }),
            Some(path) => Self::from_path(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_path(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved settings for one run of the binary
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub demo: DemoSettings,
    pub log_level: String,
}

impl Settings {
    pub fn resolve(args: &Args, file: &FileConfig) -> Result<Self, ConfigError> {
        let defaults = DemoSettings::default();

        let mut loop_config = file.loop_config.clone();
        if let Some(millis) = args.drain_timeout_ms {
            loop_config.drain_timeout = Some(Duration::from_millis(millis));
        }
        if loop_config.drain_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Invalid {
                message: "drain_timeout_ms must be positive".to_string(),
            });
        }

        let demo = DemoSettings {
            producers: args.producers.or(file.demo.producers).unwrap_or(defaults.producers),
            messages_per_producer: args
                .messages
                .or(file.demo.messages)
                .unwrap_or(defaults.messages_per_producer),
            observers: args.observers.or(file.demo.observers).unwrap_or(defaults.observers),
            exit_code: args.exit_code.or(file.demo.exit_code).unwrap_or(defaults.exit_code),
            loop_config,
        };
        if demo.producers == 0 {
            return Err(ConfigError::Invalid {
                message: "at least one producer is required".to_string(),
            });
        }
        if demo.observers == 0 {
            return Err(ConfigError::Invalid {
                message: "at least one observer is required".to_string(),
            });
        }

        Ok(Self {
            demo,
            log_level: args
                .log_level
                .clone()
                .or_else(|| file.log.level.clone())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}
