//! Configuration loading and setting resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (clap also fills this from the environment)
//! 2. TOML config file
//! 3. Compiled default
//!
//! The TOML file itself is located via an explicit path, then the
//! `ACLF_CONFIG` environment variable, then `<config dir>/aclf/config.toml`.
//! A file named explicitly (argument or `ACLF_CONFIG`) must exist. Only a
//! missing platform-default file falls back to compiled defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "ACLF_CONFIG";

/// Default training directory
pub const DEFAULT_DATASET_PATH: &str = "dataset";

/// Default HTTP port of the prediction service
pub const DEFAULT_PORT: u16 = 8000;

/// Default bind address of the prediction service
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Contents of `config.toml`
///
/// All fields are optional so that a partial file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Classifier artifact written by the trainer and read by the service
    pub model_path: Option<PathBuf>,
    /// Root of the labeled training directory
    pub dataset_path: Option<PathBuf>,
    /// Directory for transient upload files (system temp dir if unset)
    pub upload_dir: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    /// Request body limit for uploads; unlimited if unset
    pub max_upload_bytes: Option<usize>,
    pub logging: LoggingConfig,
}

/// `[logging]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is not set
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
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Locate and parse the config file
    ///
    /// # Errors
    /// When an explicitly named file is missing, or when any located file
    /// cannot be read or parsed.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let Some(source) = locate_config_source(explicit) else {
            warn!("No config directory on this platform, using defaults");
            return Ok(Self::default());
        };

        match source {
            ConfigSource::Explicit(path) if !path.exists() => Err(Error::Config(format!(
                "config file {} does not exist",
                path.display()
            ))),
            ConfigSource::PlatformDefault(path) if !path.exists() => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            source => {
                let config = Self::load(source.path())?;
                info!("Loaded configuration from {}", source.path().display());
                Ok(config)
            }
        }
    }
}

/// Origin of the config file path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named by the caller or `ACLF_CONFIG`; must exist
    Explicit(PathBuf),
    /// `<config dir>/aclf/config.toml`; may be absent
    PlatformDefault(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::PlatformDefault(path) => path,
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, ConfigSource::Explicit(_))
    }
}

/// Config file candidate: explicit path, then `ACLF_CONFIG`, then the
/// platform config directory
pub fn locate_config_source(explicit: Option<&Path>) -> Option<ConfigSource> {
    if let Some(path) = explicit {
        return Some(ConfigSource::Explicit(path.to_path_buf()));
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(ConfigSource::Explicit(PathBuf::from(path)));
        }
    }
    default_config_path().map(ConfigSource::PlatformDefault)
}

/// Path of [`locate_config_source`] without its origin
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    locate_config_source(explicit).map(|source| source.path().to_path_buf())
}

/// `<config dir>/aclf/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aclf").join("config.toml"))
}

/// First present value of CLI, TOML, default
pub fn resolve<T>(cli_arg: Option<T>, toml_value: Option<T>, default: T) -> T {
    cli_arg.or(toml_value).unwrap_or(default)
}
