//! Configuration for mediadir.
//!
//! Configuration is layered with the `config` crate:
//! - Bundled defaults (include_str! from mediadir.toml)
//! - User overrides (~/.config/mediadir/mediadir.toml, then ./mediadir.toml)
//! - `MEDIADIR_*` environment variables
//!
//! Later sources override earlier ones.

use crate::{SortOrder, StorageMode};
use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use mediadir_error::{ConfigError, MediaDirError, MediaDirResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, instrument};

const MIN_BUFFER_SIZE: usize = 1024;
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Top-level mediadir configuration.
///
/// # Example
///
/// ```toml
/// root = "/var/lib/mediadir"
/// storage_mode = "scoped"
/// buffer_size = 8192
///
/// [default_sort]
/// column = "id"
/// direction = "descending"
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_", into)]
pub struct MediaDirConfig {
    /// Directory the filesystem provider keeps content under
    #[serde(default = "default_root")]
    root: PathBuf,

    /// Whether absolute paths are exposed for records
    #[serde(default)]
    storage_mode: StorageMode,

    /// Size of the intermediate copy buffer in bytes
    #[serde(default = "default_buffer_size")]
    buffer_size: usize,

    /// Sort order applied to queries that do not specify one
    #[serde(default)]
    default_sort: SortOrder,
}

fn default_root() -> PathBuf {
    PathBuf::from("mediadir-store")
}

fn default_buffer_size() -> usize {
    8 * 1024
}

impl Default for MediaDirConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            storage_mode: StorageMode::default(),
            buffer_size: default_buffer_size(),
            default_sort: SortOrder::default(),
        }
    }
}

impl MediaDirConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> MediaDirResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                MediaDirError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                MediaDirError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled default.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mediadir_core::MediaDirConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = MediaDirConfig::load()?;
    /// println!("content root: {}", config.root().display());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> MediaDirResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../mediadir.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/mediadir/mediadir.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("mediadir").required(false))
            .add_source(Environment::with_prefix("MEDIADIR"));

        let config: Self = builder
            .build()
            .map_err(|e| {
                MediaDirError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                MediaDirError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that values are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy buffer size is outside 1 KiB..=1 MiB.
    pub fn validate(&self) -> MediaDirResult<()> {
        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(ConfigError::new(format!(
                "buffer_size must be between {} and {}, got {}",
                MIN_BUFFER_SIZE, MAX_BUFFER_SIZE, self.buffer_size
            ))
            .into());
        }
        Ok(())
    }
}
