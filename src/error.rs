// src/error.rs

//! Error types shared across the mirror library

use thiserror::Error;

/// Errors produced by mirror operations
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem operation failed (message carries the path)
    #[error("I/O error: {0}")]
    IoError(String),

    /// Underlying I/O error without extra context
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Installer transfer failed (non-success status or transport error)
    #[error("Download failed: {0}")]
    DownloadError(String),

    /// Config, state, or manifest document could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Something the operation needs does not exist
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Mirror could not be initialized or opened
    #[error("Initialization error: {0}")]
    InitError(String),

    /// Configuration is missing a required value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// git invocation failed
    #[error("git error: {0}")]
    VcsError(String),

    /// Package identifier is not of the form `Publisher.Package`
    #[error("Invalid package id '{0}': expected Publisher.Package")]
    InvalidPackageId(String),
}

/// Result type for mirror operations
pub type Result<T> = std::result::Result<T, Error>;
