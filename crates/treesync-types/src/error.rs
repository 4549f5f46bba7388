//! Error types and handling for TreeSync
//!
//! This module provides the error taxonomy shared by every TreeSync crate.
//! Item-level failures are reported through these types by the functions that
//! touch a single file or folder; the scan and transfer walkers catch them at
//! item scope and log them instead of aborting a run.

use std::path::PathBuf;

/// Main error type for TreeSync operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// File or folder not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was not found
        path: PathBuf,
    },

    /// Permission denied
    #[error("Permission denied: {path}")]
    PermissionDenied {
        /// Path with permission issues
        path: PathBuf,
    },

    /// Hash marker could not be read or written
    #[error("Hash marker error in '{path}': {message}")]
    Marker {
        /// Destination folder owning the marker
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Synchronization error
    #[error("Synchronization error: {message}")]
    Sync {
        /// Error message describing the synchronization issue
        message: String,
    },

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Build an I/O error that names the path and the operation
    pub fn io_at<P: Into<PathBuf>>(operation: &str, path: P, error: &std::io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io {
                message: format!("Failed to {} '{}': {}", operation, path.display(), error),
            },
        }
    }

    /// Create a new marker error
    pub fn marker<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Marker {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new sync error
    pub fn sync<S: Into<String>>(message: S) -> Self {
        Self::Sync {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
