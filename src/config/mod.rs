use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{format_brl, format_cents, Cents, DayOrder};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "moneymine.json";
pub const DEFAULT_DATABASE: &str = "moneymine.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// How amounts are rendered in tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayLocale {
    /// `-1234.56`
    #[default]
    #[serde(rename = "plain")]
    Plain,
    /// `-R$ 1.234,56`
    #[serde(rename = "pt-BR")]
    PtBr,
}

impl DisplayLocale {
    pub fn format(&self, cents: Cents) -> String {
        match self {
            DisplayLocale::Plain => format_cents(cents),
            DisplayLocale::PtBr => format_brl(cents),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: String,
    pub locale: DisplayLocale,
    pub day_order: DayOrder,
    /// Default tracing filter when neither RUST_LOG nor --verbose is set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.into(),
            locale: DisplayLocale::default(),
            day_order: DayOrder::default(),
            log_level: "warn".into(),
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, `moneymine.json` in the
    /// working directory is used if present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
