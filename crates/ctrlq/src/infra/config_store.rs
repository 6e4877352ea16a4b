use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::config::AppConfig;
use crate::infra::file_store::write_atomic;

/// File name of the persisted configuration.
pub const CONFIG_FILE: &str = "ctrlq-config.json";

/// Returns the default configuration file location (`<config dir>/ctrlq`).
pub fn default_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("ctrlq").join(CONFIG_FILE);
    }

    PathBuf::from(".ctrlq").join(CONFIG_FILE)
}

/// Failures while loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file `{}`: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON file persistence for [`AppConfig`].
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store reading and writing `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the configuration file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration, falling back to defaults when no file exists.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<AppConfig, ConfigError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(AppConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Persists `config`, creating the parent folder when needed.
    ///
    /// # Errors
    /// Returns an error when the configuration cannot be encoded or written.
    pub async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        write_atomic(&self.path, raw.as_bytes())
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
