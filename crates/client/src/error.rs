//! Client Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the cache and the
//! symbol sources are kept as children in the tree.
//!
//! "Not found" is deliberately absent: it is a normal outcome, reported as
//! [`Resolution::NotFound`](crate::Resolution::NotFound).

use debuginfod_source::error::{Error as SourceError, ErrorKind as SourceErrorKind};
use derive_more::{Display, Error};

/// A client error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A server answered with something other than the artifact or "not
    /// found". Resolution stopped there; later servers were not asked.
    #[display("server {server} failed{}", status.map(|s| format!(" with status code {s}")).unwrap_or_default())]
    Server {
        #[error(not(source))]
        server: String,
        #[error(not(source))]
        status: Option<u16>,
    },
    /// A server could not be reached, or the transfer broke or timed out.
    #[display("could not reach server {server}")]
    Transport {
        #[error(not(source))]
        server: String,
    },
    /// The artifact could not be written into the cache, or the cache could
    /// not be cleared.
    #[display("cache filesystem error")]
    Filesystem,
    /// A configured server cannot be used (bad URL, client setup failure).
    #[display("invalid server configuration")]
    Source,
    /// The build-id is empty or is not hexadecimal.
    #[display("invalid build-id: {_0:?}")]
    InvalidBuildId(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Server { status, .. } => status.is_some_and(|s| s >= 500 || s == 429),
            Self::Transport { .. } | Self::Filesystem => true,
            Self::Source | Self::InvalidBuildId(_) => false,
        }
    }

    /// Returns `true` if no answer was ever received from the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Classify a symbol source failure on behalf of `server`, keeping the
    /// source's own error frame as a child in the error tree.
    #[track_caller]
    pub(crate) fn source(server: &str, err: SourceError) -> Error {
        let server = server.to_string();
        let kind = match &*err {
            SourceErrorKind::Status { status, .. } => Self::Server { server, status: Some(*status) },
            SourceErrorKind::BackendError(_) => Self::Server { server, status: None },
            SourceErrorKind::Network | SourceErrorKind::Timeout => Self::Transport { server },
            SourceErrorKind::InvalidUrl(_) => Self::Source,
        };
        err.raise(kind)
    }
}
