// src/error.rs

//! Error types for the zarch library
//!
//! Every fallible operation in the library returns [`Result`]. Each variant
//! is fatal to the command that raised it; the binary maps [`ErrorKind`] to a
//! process exit status and prints [`Error::hint`] beneath the message.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Package '{0}' not found in registry")]
    PackageNotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Malformed {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Invalid package spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Registry rejected the request (HTTP {status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Malformed,
    PermissionDenied,
    CorruptArchive,
    Unauthorized,
    NetworkError,
    ServerRejected,
    Io,
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    ///
    /// `PermissionDenied` is kept distinct so the user is told to escalate
    /// privilege instead of retrying.
    pub fn io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => {
                Error::PermissionDenied(format!("{}: {}", path.display(), err))
            }
            io::ErrorKind::NotFound => Error::NotFound(format!("{}: {}", path.display(), err)),
            _ => Error::Io(format!("{}: {}", path.display(), err)),
        }
    }

    /// Build a `Malformed` error for a structured file
    pub fn malformed(path: &Path, reason: impl ToString) -> Self {
        Error::Malformed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::PackageNotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::Malformed { .. } | Error::InvalidSpec { .. } => ErrorKind::Malformed,
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::CorruptArchive(_) => ErrorKind::CorruptArchive,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::NetworkError(_) => ErrorKind::NetworkError,
            Error::ServerRejected { .. } => ErrorKind::ServerRejected,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Io => 1,
            ErrorKind::NotFound => 2,
            ErrorKind::AlreadyExists => 3,
            ErrorKind::Malformed => 4,
            ErrorKind::PermissionDenied => 5,
            ErrorKind::CorruptArchive => 6,
            ErrorKind::Unauthorized => 7,
            ErrorKind::NetworkError => 8,
            ErrorKind::ServerRejected => 9,
        }
    }

    /// One-line remedy shown under the error message, if there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::PermissionDenied => {
                Some("Re-run the command with elevated privileges (e.g. sudo).")
            }
            ErrorKind::Unauthorized => Some("Run 'zarch login' first."),
            ErrorKind::NetworkError => Some("Check your connection and the registry URL."),
            ErrorKind::CorruptArchive => {
                Some("The downloaded archive is unusable; nothing was changed.")
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(err.to_string()),
            _ => Error::Io(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}
