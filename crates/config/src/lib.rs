//! Configuration for the VK adapter and the `lookup` tool
//!
//! Settings come from a YAML file when one exists, otherwise from `VK_*` and
//! `LOG_*` environment variables. Either way, anything left unset keeps the
//! VK defaults (`oauth.vk.com` / `api.vk.com`, API version 5.52, the standard
//! scope and profile field lists).

use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod types;

pub use types::*;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_VAR: &str = "VK_CONFIG_PATH";

/// Searched in order when no explicit path is given
pub const DEFAULT_CONFIG_PATHS: [&str; 3] =
    ["config/vk.yaml", "config/config.yaml", "vk.yaml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No configuration file found (tried {paths})")]
    FileNotFound { paths: String },

    #[error("Failed to read {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    ParseError {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Invalid environment configuration: {0}")]
    EnvError(String),
}

impl AppConfig {
    /// Parse a YAML configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the first existing file among `paths`
    pub fn load_from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ConfigError> {
        let paths: Vec<&Path> = paths.iter().map(AsRef::as_ref).collect();

        match paths.iter().find(|p| p.exists()) {
            Some(path) => Self::load_from_file(path),
            None => Err(ConfigError::FileNotFound {
                paths: paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// `$VK_CONFIG_PATH` if set (it must exist), else the default locations
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => Self::load_from_file(PathBuf::from(path)),
            None => Self::load_from_paths(&DEFAULT_CONFIG_PATHS),
        }
    }

    /// File configuration when present, environment variables otherwise
    pub fn resolve() -> Result<Self, ConfigError> {
        match Self::load() {
            Err(ConfigError::FileNotFound { .. }) => Self::from_env(),
            result => result,
        }
    }
}
