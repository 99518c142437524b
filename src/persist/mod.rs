//! Load/save interfaces for client state kept between runs.
//!
//! Both stores write JSON files under [`crate::config::xdg::cache_dir`].
//! Callers treat every read failure as "nothing saved": the last-run state
//! is advisory and history degrades to empty.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::xdg;

/// Previously viewed team/channel.
pub mod last_run;

/// Per-channel input history.
pub mod history;

pub use history::{FileHistoryStore, HistoryStore, InputHistory};
pub use last_run::{FileLastRunStore, LastRunState, LastRunStore};

/// Errors from reading or writing persisted state.
#[derive(Error, Debug)]
pub enum PersistError {
    /// Nothing has been saved yet.
    #[error("No saved state at {path}")]
    Missing {
        /// Expected file location.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file content is not valid for this format.
    #[error("Failed to decode {path}: {source}")]
    Decode {
        /// File with bad content.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The file could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Destination file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The value could not be serialized.
    #[error("Failed to encode state for {path}: {source}")]
    Encode {
        /// Destination file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Default directory for persisted state.
pub fn state_dir() -> PathBuf {
    xdg::cache_dir()
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PersistError::Missing {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(PersistError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&content).map_err(|source| PersistError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| PersistError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        xdg::ensure_dir(parent).map_err(|source| PersistError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    // Write to a sibling and rename so a crash never leaves half a file.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|source| PersistError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })
}
