//! Symbol source trait and implementations.
//!
//! This module defines the `SymbolSource` trait: one configured server that
//! may or may not hold the artifact for a [`CacheKey`]. The fetch loop only
//! ever talks to this trait, so it does not care whether the artifact comes
//! from a debuginfod HTTP server or an object-storage bucket.

mod http;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::http::HttpSource;
#[cfg(feature = "mock")]
pub use self::mock::{MockResponse, MockSource};
#[cfg(feature = "s3")]
pub use self::s3::S3Source;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use debuginfod_cache::CacheKey;
use futures::Stream;
use std::pin::Pin;

/// Response body, yielded in whatever chunks the transport delivers.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

/// Outcome of asking one source for one artifact.
pub enum Fetch {
    /// The source has the artifact; its body has not been read yet.
    Found(ByteStream),
    /// The source does not have the artifact (HTTP 404, missing object).
    Missing,
}
impl Fetch {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}
impl std::fmt::Debug for Fetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found(_) => f.write_str("Found(..)"),
            Self::Missing => f.write_str("Missing"),
        }
    }
}

/// Unified interface for symbol servers.
///
/// # Errors
/// Anything other than "found" or "missing" is an error: the source answered
/// with an unexpected status ([`Status`](crate::error::ErrorKind::Status)),
/// or never answered at all ([`Network`](crate::error::ErrorKind::Network),
/// [`Timeout`](crate::error::ErrorKind::Timeout)). Errors may also surface
/// later, from the [`ByteStream`] itself, if the transfer breaks midway.
///
/// # Examples
///
/// ```no_run
/// use debuginfod_cache::CacheKey;
/// use debuginfod_source::{Fetch, SymbolSource, error::Result};
/// use futures::TryStreamExt;
///
/// async fn size_of_artifact(source: &dyn SymbolSource, key: &CacheKey) -> Result<Option<usize>> {
///     let Fetch::Found(mut body) = source.fetch(key).await? else {
///         return Ok(None);
///     };
///     let mut total = 0;
///     while let Some(chunk) = body.try_next().await? {
///         total += chunk.len();
///     }
///     Ok(Some(total))
/// }
/// ```
#[async_trait]
pub trait SymbolSource: Send + Sync {
    /// Human-readable identity of the source (its URL or bucket), used for
    /// logging and error reports only.
    fn name(&self) -> &str;

    /// Request the artifact addressed by `key`.
    async fn fetch(&self, key: &CacheKey) -> Result<Fetch>;
}
