//! Editor settings read from a TOML file.
//!
//! ```toml
//! log_level = "debug"
//! log_file = "target-editor.log"
//! export_dir = "exports"
//!
//! [database]
//! backend = "sqlite"
//! connection_string = "targets.db"
//! ```
//!
//! Every key is optional. A missing file yields [`Settings::default`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use target_core::db::DbConfig;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_SETTINGS_FILE: &str = "target-editor.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DbConfig,
    /// Bare level or full `EnvFilter` directive.
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub export_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DbConfig {
                backend: "sqlite".to_string(),
                connection_string: "targets.db".to_string(),
            },
            log_level: "info".to_string(),
            log_file: None,
            export_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
