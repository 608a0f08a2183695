//! Error types for log loading, robot models and view snapshots.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening a log file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing exists at the given path
    #[error("File '{}' not found", .0.display())]
    FileNotFound(PathBuf),

    /// The file is a MAT-file of a version that is not HDF5 based
    #[error("Unsupported file version {found} in '{}' (expected MATLAB 7.3)", path.display())]
    UnsupportedVersion { path: PathBuf, found: String },

    /// The configured root group is not in the file
    #[error("Root group '{0}' not found in log")]
    MissingRoot(String),

    /// No signal has a single sample
    #[error("Log contains no timestamped signal")]
    EmptyLog,

    /// A signal's data does not line up with its timestamps
    #[error("Malformed signal '{path}': {reason}")]
    Shape { path: String, reason: String },

    /// Underlying HDF5 failure
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Creates a shape error for the signal at `path`.
    pub fn shape(path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::Shape {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while locating or parsing a robot description.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No candidate file exists
    #[error("Model '{name}' not found in search path ({} locations tried)", searched.len())]
    NotFound { name: String, searched: Vec<PathBuf> },

    /// The URDF could not be parsed
    #[error("Invalid URDF '{}': {reason}", path.display())]
    Urdf { path: PathBuf, reason: String },

    /// The URDF parsed but has no usable kinematic tree
    #[error("Invalid kinematic tree: {0}")]
    Tree(String),
}

/// Errors raised while saving or restoring a view snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// Written by a newer viewer
    #[error("Snapshot version {found} is newer than supported version {supported}")]
    Version { found: u32, supported: u32 },
}
