//! Unified error types for the appcell workspace.
//!
//! Higher-level crates define their own domain-specific error enums that
//! wrap these common variants when appropriate.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum AppcellError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A document could not be parsed as JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path of the offending document.
        path: PathBuf,
        /// Underlying parser error.
        source: serde_json::Error,
    },

    /// A system call failed.
    #[error("{operation} failed for {path}: {source}")]
    Sys {
        /// Name of the failed operation (`mount`, `umount`, ...).
        operation: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// OS error reported by the kernel.
        source: std::io::Error,
    },

    /// A configuration value or document shape is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl AppcellError {
    /// Shorthand for an [`AppcellError::Io`] at `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for an [`AppcellError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, AppcellError>;
