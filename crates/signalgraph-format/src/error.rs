//! Error type for document load/save operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing a graph or baked-metadata
/// document.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Failed to read a file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a parent directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse or serialize JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A wire referenced a node id not present in the document.
    #[error("wire '{wire_id}' references unknown node '{node_id}'")]
    DanglingWire {
        /// The offending wire's id.
        wire_id: String,
        /// The missing node id.
        node_id: String,
    },
}

impl FormatError {
    /// Builds a read-file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FormatError::ReadFile { path: path.into(), source }
    }

    /// Builds a write-file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FormatError::WriteFile { path: path.into(), source }
    }

    /// Builds a create-directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FormatError::CreateDir { path: path.into(), source }
    }
}
