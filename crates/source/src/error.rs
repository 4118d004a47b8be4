//! Source Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A symbol source error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for symbol source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configured server location cannot be used as a base URL.
    #[display("invalid server URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// Server answered, but with neither success nor "not found".
    #[display("{url} returned status code {status}")]
    Status { url: String, status: u16 },
    /// Connection, DNS, TLS or mid-transfer failure.
    #[display("network error")]
    Network,
    /// Configured request timeout elapsed.
    #[display("request timed out")]
    Timeout,
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` for failures below the protocol level, where the
    /// server never gave an answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            kind => kind.is_transport(),
        }
    }
}
