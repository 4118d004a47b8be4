//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration files or environment variables could not be merged or
    /// have the wrong shape.
    #[display("invalid configuration")]
    Load,
    /// The symbol-server registry exists but could not be parsed.
    #[display("invalid server registry: {}", _0.display())]
    Registry(#[error(not(source))] PathBuf),
    /// A server URL is empty or is not an absolute http(s) URL.
    #[display("invalid server URL: {_0:?}")]
    InvalidUrl(#[error(not(source))] String),
    /// An S3 server has a `key-id` without a `key-secret`, or the reverse.
    #[display("incomplete credentials for bucket {_0:?}")]
    Credentials(#[error(not(source))] String),
    /// The cache path is empty.
    #[display("invalid cache path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
