use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::pdb::PdbError;
use crate::core::models::residue::ResidueKey;
use crate::core::sasa::KernelError;
use std::io;
use std::path::{PathBuf, StripPrefixError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Stage requested out of order: {0}")]
    State(String),

    #[error("Inconsistent data between stages: {0}")]
    Data(String),

    #[error("Residue {key} of site {site} collides with an existing residue in the merged structure")]
    Conflict { key: ResidueKey, site: usize },

    #[error("Surface area computation failed for '{structure}' (probe {probe_radius} nm, frame {frame}): {source}")]
    Computation {
        structure: String,
        probe_radius: f64,
        frame: usize,
        source: KernelError,
    },

    #[error("Output path {path:?} would be written by both {first} and {second}")]
    PathCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("External tool '{binary}' is not invocable: {reason}")]
    ExternalTool { binary: String, reason: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to read or write {path:?}: {source}")]
    Format { path: PathBuf, source: PdbError },

    #[error("I/O error on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to build archive {path:?}: {source}")]
    Archive { path: PathBuf, source: ArchiveError },

    #[error("Failed to draw plot {path:?}: {reason}")]
    Plot { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("entry outside the output directory: {0}")]
    Entry(#[from] StripPrefixError),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, source: PdbError) -> Self {
        EngineError::Format {
            path: path.into(),
            source,
        }
    }
}
