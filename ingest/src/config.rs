use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings of the `relay` binary, read from an optional YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: Option<String>,
    /// Directory the uploaded demo files are stored in.
    pub media_root: PathBuf,
    /// Directory holding `<map>.json` and `<map>.jpg` files.
    pub map_cache: PathBuf,
    /// Directory rendered map images are written to.
    pub map_images: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            media_root: PathBuf::from("media/demos"),
            map_cache: PathBuf::from("media/maps"),
            map_images: PathBuf::from("media/img"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl AppConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Reads the config file, or falls back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}
