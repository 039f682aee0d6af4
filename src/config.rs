//! Multiplexer configuration.
//!
//! Settings are read from TOML. The user-wide file lives at
//! `$XDG_CONFIG_HOME/lspx/lspx.toml`, falling back to the platform config
//! directory (`~/.config/lspx/lspx.toml` on Linux).
//!
//! ```toml
//! [server_info]
//! name = "lspx"
//! version = "0.1.0"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_NAME: &str = "lspx";
const CONFIG_FILE: &str = "lspx.toml";

/// Identity advertised when no backend is configured.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerInfoSettings {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfoSettings {
    fn default() -> Self {
        Self {
            name: "lspx".to_string(),
            version: "0.1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MultiplexerSettings {
    pub server_info: ServerInfoSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl MultiplexerSettings {
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            target: "lspx::config",
            "Loaded config from {}",
            path.display()
        );
        Self::from_toml_str(&content)
    }

    /// Load the user config if it exists, defaults otherwise.
    pub fn load_user() -> ConfigResult<Self> {
        match user_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Returns the path to the user configuration file.
///
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/lspx/lspx.toml
/// 2. Otherwise: the platform config directory from `dirs`
///
/// Returns None if neither can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(base.join(APP_NAME).join(CONFIG_FILE))
}
