/*
 * Configuration management for the log sink
 *
 * This module handles:
 * - Parsing configuration from TOML files, with or without a [logging] section
 * - Providing default values for every setting
 * - Resolving the final log file path from a folder and a file name
 *
 * The configuration determines:
 * - Which file entries are appended to
 * - The initial severity threshold
 * - Whether missing directories are created when opening
 * - How long shutdown may wait for the queue to drain
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::severity::Severity;

/// Configuration for the logger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// File the sink appends to
    #[serde(default = "default_file_path")]
    pub file_path: PathBuf,

    /// Folder the file lives in; joined with `file_path` when set
    #[serde(default)]
    pub log_folder: Option<PathBuf>,

    /// Minimum level to record
    #[serde(default = "default_threshold")]
    pub threshold: Severity,

    /// Create missing parent directories when opening (default: false)
    #[serde(default)]
    pub create_dirs: bool,

    /// Upper bound on how long shutdown waits for the drain; unset waits
    /// until every queued entry is written
    #[serde(default)]
    pub shutdown_timeout_secs: Option<u64>,
}

fn default_file_path() -> PathBuf {
    PathBuf::from("app.log")
}

fn default_threshold() -> Severity {
    Severity::Info
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            file_path: default_file_path(),
            log_folder: None,
            threshold: default_threshold(),
            create_dirs: false,
            shutdown_timeout_secs: None,
        }
    }
}

/// Configuration wrapper to handle the [logging] section in TOML
#[derive(Debug, Deserialize)]
struct ConfigWrapper {
    logging: LogConfig,
}

impl LogConfig {
    /// Creates configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error.
    pub fn from_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref();
        let config_str = match fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    path = %file_path.display(),
                    error = %e,
                    "could not read log config, using defaults"
                );
                return Ok(LogConfig::default());
            }
        };

        Self::from_toml_str(&config_str)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        // Try to parse with the [logging] section wrapper first
        match toml::from_str::<ConfigWrapper>(config_str) {
            Ok(wrapper) => Ok(wrapper.logging),
            Err(e) => {
                // Otherwise accept a flat document; report the first error
                toml::from_str::<LogConfig>(config_str)
                    .map_err(|_| Error::Config(format!("failed to parse config: {}", e)))
            }
        }
    }

    /// The file the sink should open: `log_folder/file_path`, or `file_path`
    /// alone when no folder is set.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.log_folder {
            Some(folder) => folder.join(&self.file_path),
            None => self.file_path.clone(),
        }
    }

    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout_secs.map(Duration::from_secs)
    }
}
