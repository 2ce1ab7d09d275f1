//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treeguard/treeguard.toml`
//! 3. Environment variables: `TREEGUARD_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::IGNORED_CHARS;

#[derive(Error, Debug)]
#[error("config error: {message}")]
pub struct SettingsError {
    pub message: String,
}

/// Unified configuration for treeguard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Hard cap on nodes per tree (allocation and verification bound)
    pub max_tree_size: u64,
    /// Token separator for the serialized tree format (first char is used)
    pub separator: String,
    /// Directory for Graphviz dumps and the HTML log
    pub log_dir: PathBuf,
    /// Graphviz binary invoked to render dumps
    pub dot_command: String,
    /// Characters the token sorter skips during comparison
    pub ignored_chars: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_tree_size: 1000,
            separator: " ".to_string(),
            log_dir: PathBuf::from("log"),
            dot_command: "dot".to_string(),
            ignored_chars: IGNORED_CHARS.to_string(),
        }
    }
}

/// Get the XDG config directory for treeguard.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treeguard").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treeguard.toml"))
}

impl Settings {
    /// The single separator character used around serialized tokens.
    pub fn separator_char(&self) -> char {
        self.separator.chars().next().unwrap_or(' ')
    }

    /// Expand `~`, `$VAR`, and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        let raw = self.log_dir.to_string_lossy().into_owned();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.log_dir = PathBuf::from(expanded.into_owned());
        }
    }

    /// Load settings with layered precedence: defaults, then the global XDG
    /// config file, then `TREEGUARD_*` environment variables.
    pub fn load() -> Result<Self, SettingsError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("max_tree_size", defaults.max_tree_size as i64)
            .map_err(config_err)?
            .set_default("separator", defaults.separator.clone())
            .map_err(config_err)?
            .set_default("log_dir", defaults.log_dir.to_string_lossy().to_string())
            .map_err(config_err)?
            .set_default("dot_command", defaults.dot_command.clone())
            .map_err(config_err)?
            .set_default("ignored_chars", defaults.ignored_chars.clone())
            .map_err(config_err)?;

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        builder = builder.add_source(Environment::with_prefix("TREEGUARD").separator("__"));

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        if settings.separator.is_empty() {
            return Err(SettingsError {
                message: "separator must be a single character".to_string(),
            });
        }
        if settings.max_tree_size == 0 {
            return Err(SettingsError {
                message: "max_tree_size must be at least 1".to_string(),
            });
        }

        settings.expand_paths();
        Ok(settings)
    }

    /// Override the log directory (CLI flag beats config).
    pub fn with_log_dir(mut self, log_dir: Option<&Path>) -> Self {
        if let Some(dir) = log_dir {
            self.log_dir = dir.to_path_buf();
        }
        self
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(|e| SettingsError {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# treeguard configuration
#
# Location: ~/.config/treeguard/treeguard.toml
# Environment variables with the TREEGUARD_ prefix override file values,
# e.g. TREEGUARD_MAX_TREE_SIZE=5000.

# Hard cap on nodes per tree
# max_tree_size = 1000

# Token separator for serialized trees (single character)
# separator = " "

# Directory for Graphviz dumps and the HTML log
# log_dir = "log"

# Graphviz binary used to render dumps
# dot_command = "dot"

# Characters the token sorter ignores during comparison
# ignored_chars = " ,.;:'\"-!?`~()[]{}"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> SettingsError {
    SettingsError {
        message: e.to_string(),
    }
}
