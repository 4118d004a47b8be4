//! HTTP(S) symbol server speaking the debuginfod path convention.
//!
//! An artifact is requested with a plain `GET <base>/buildid/<id>/<type>`.
//! `200` means the body is the artifact, `404` means the server doesn't have
//! it, and every other status is an error.

use crate::backend::{ByteStream, Fetch};
use crate::error::{ErrorKind, Result};
use crate::SymbolSource;
use async_trait::async_trait;
use debuginfod_cache::CacheKey;
use exn::ResultExt;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Debuginfod-compatible HTTP server.
///
/// # Examples
///
/// ```no_run
/// use debuginfod_source::backend::HttpSource;
/// use std::time::Duration;
///
/// # fn example() -> debuginfod_source::error::Result<()> {
/// // Bounded: the whole request (connect and body) must finish in 90s.
/// let elfutils = HttpSource::new("https://debuginfod.elfutils.org/", Some(Duration::from_secs(90)))?;
/// // Unbounded: wait for as long as the server takes.
/// let internal = HttpSource::new("http://symbols.internal:8002", None)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: Url,
    client: Client,
}
impl HttpSource {
    /// Create a source for the server at `base_url`.
    ///
    /// `timeout` bounds the whole request, from connecting until the last
    /// byte of the body. `None` means no bound at all.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().or_raise(|| ErrorKind::BackendError("could not build HTTP client".to_string()))?;
        Self::with_client(base_url, client)
    }

    /// Create a source sharing an existing [`Client`].
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let base = Url::parse(base_url).or_raise(|| ErrorKind::InvalidUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { base, client })
    }

    /// Full request URL for a key.
    ///
    /// Key segments are appended to the base URL's path (a trailing slash on
    /// the base is optional), each one percent-encoded.
    pub fn url_for(&self, key: &CacheKey) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ErrorKind::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(key.segments());
        Ok(url)
    }

    fn transport<T>(err: reqwest::Error) -> Result<T> {
        let kind = if err.is_timeout() { ErrorKind::Timeout } else { ErrorKind::Network };
        Err(err).or_raise(|| kind)
    }
}

#[async_trait]
impl SymbolSource for HttpSource {
    fn name(&self) -> &str {
        self.base.as_str()
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Fetch> {
        let url = self.url_for(key)?;
        tracing::info!(url = %url, "Requesting artifact");
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(err) => return Self::transport(err),
        };
        match response.status() {
            StatusCode::OK => {
                let body: ByteStream = Box::pin(response.bytes_stream().map(|chunk| match chunk {
                    Ok(bytes) => Ok(bytes),
                    Err(err) => Self::transport(err),
                }));
                Ok(Fetch::Found(body))
            },
            StatusCode::NOT_FOUND => {
                tracing::info!(url = %url, "Not found");
                Ok(Fetch::Missing)
            },
            status => exn::bail!(ErrorKind::Status { url: url.to_string(), status: status.as_u16() }),
        }
    }
}
