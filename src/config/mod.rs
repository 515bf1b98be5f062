mod columns;
mod source;

pub use columns::Columns;
pub use source::{resolve_sources, Source, DEFAULT_INPUTS};

use crate::error::{MergeError, Result};
use directories::ProjectDirs;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default output file when neither the CLI nor the config names one
pub const DEFAULT_OUTPUT: &str = "combined_invoices.csv";

/// Default number of invoices shown in the console preview
pub const DEFAULT_PREVIEW: usize = 5;

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub output: Option<PathBuf>,
    pub preview: Option<usize>,
    pub columns: Columns,
    /// Input path -> currency code
    pub sources: IndexMap<PathBuf, String>,
}

impl Config {
    pub fn output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    pub fn preview(&self) -> usize {
        self.preview.unwrap_or(DEFAULT_PREVIEW)
    }
}

/// Get the config file path (e.g. ~/.config/invoice-merge/config.toml)
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "invoice-merge").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load config from an explicit path, or from the default location when present.
///
/// An explicit path must exist. A missing default file yields the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit.map(Path::to_path_buf).or_else(default_config_file) {
        Some(path) => path,
        None => return Ok(Config::default()),
    };

    tracing::debug!(path = %path.display(), "loading config");
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if explicit.is_some() {
                return Err(MergeError::ConfigFileNotFound(path));
            }
            tracing::debug!("no config file found, using defaults");
            return Ok(Config::default());
        }
        Err(source) => return Err(MergeError::ConfigRead { path, source }),
    };
    toml::from_str(&content).map_err(|e| MergeError::ConfigParse { path, source: e })
}
