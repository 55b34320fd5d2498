//! CLI configuration, loaded from `filecast.toml` in the working
//! directory. Missing file means defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use filecast_protocol::CLOSE_NORMAL;

/// Errors from loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// PEM root certificate bundle used to validate server chains.
    pub trust_bundle: PathBuf,
    /// Close code used when `close` is issued without one.
    pub default_close_code: u16,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            trust_bundle: PathBuf::from("server.pem"),
            default_close_code: CLOSE_NORMAL,
        }
    }
}

impl CliConfig {
    pub const FILE_NAME: &'static str = "filecast.toml";

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(Self::FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
