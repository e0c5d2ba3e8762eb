// src/error.rs

use thiserror::Error;

/// Core error types for reposx
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O errors with context about the failing operation
    #[error("I/O error: {0}")]
    IoError(String),

    /// Home directory could not be determined
    #[error("Could not determine home directory")]
    HomeDirNotFound,

    /// HTTP client could not be constructed
    #[error("Failed to initialize: {0}")]
    InitError(String),

    /// Transport failure or non-success HTTP status
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Malformed index document
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Package missing from the index
    #[error("{0}")]
    NotFoundError(String),

    /// Host architecture outside the supported families
    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    /// Package has no download URL for the requested family
    #[error("package {package} has no {family} download url")]
    MissingArchitectureUrl { package: String, family: String },

    /// Package name that cannot be used as a store directory name
    #[error("invalid package name: {0:?}")]
    InvalidPackageName(String),
}

/// Result type alias using reposx's Error type
pub type Result<T> = std::result::Result<T, Error>;
