//! Layered configuration loading
//!
//! Values are merged in this order, later sources winning:
//!
//! 1. `#[serde(default)]` values of the target type
//! 2. an optional TOML file
//! 3. environment variables named `<PREFIX>_<KEY>`, nested keys joined by `__`
//!    (`MEDCALL_MEDIA__VIDEO=false` sets `media.video`)

use crate::errors::types::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Default environment prefix for MedCall settings
pub const DEFAULT_ENV_PREFIX: &str = "MEDCALL";

/// Where configuration values are read from
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Optional TOML file
    pub file: Option<PathBuf>,
    /// Whether a missing file is an error
    pub file_required: bool,
    /// Environment variable prefix
    pub env_prefix: String,
}

impl Default for ConfigSource {
    fn default() -> Self {
        Self {
            file: None,
            file_required: false,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }
}

impl ConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from a file that must exist
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self.file_required = true;
        self
    }

    /// Read from a file if it exists
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self.file_required = false;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }
}

/// Load and deserialize a configuration value from `source`
pub fn load_config<T: DeserializeOwned>(source: &ConfigSource) -> Result<T> {
    let mut builder = Config::builder();

    if let Some(path) = &source.file {
        tracing::debug!("Loading configuration file {}", path.display());
        builder = builder.add_source(
            File::from(path.as_path())
                .format(FileFormat::Toml)
                .required(source.file_required),
        );
    }

    builder = builder.add_source(
        Environment::with_prefix(&source.env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let merged = builder.build()?;
    merged
        .try_deserialize::<T>()
        .map_err(|e| Error::Config(format!("Failed to deserialize configuration: {}", e)))
}
