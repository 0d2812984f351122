//! Runtime Configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::content::Dir;
use crate::filters::TableGeneration;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("globalDir must be -1, 0 or 1, got {0}")]
    InvalidGlobalDir(i8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Direction of the page being rendered: 1 LTR, -1 RTL, 0 unknown.
    #[serde(default = "default_global_dir")]
    pub global_dir: i8,
    #[serde(default)]
    pub filter_tables: TableGeneration,
    /// Used for delegate calls that don't say whether an empty default is ok.
    #[serde(default)]
    pub allow_empty_default: bool,
}

fn default_global_dir() -> i8 { 1 }

impl RuntimeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        debug!(path = %path.display(), ?config, "Loaded runtime config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.global_dir {
            -1..=1 => Ok(()),
            other => Err(ConfigError::InvalidGlobalDir(other)),
        }
    }

    pub fn global_dir(&self) -> Dir {
        Dir::from_sign(i64::from(self.global_dir))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            global_dir: default_global_dir(),
            filter_tables: TableGeneration::default(),
            allow_empty_default: false,
        }
    }
}
