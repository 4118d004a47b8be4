//! In-memory symbol source for testing.

use crate::SymbolSource;
use crate::backend::{ByteStream, Fetch};
use crate::error::{Error, ErrorKind, Result};
use async_trait::async_trait;
use bytes::Bytes;
use debuginfod_cache::CacheKey;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Bodies are handed out in chunks this small so that consumers really do
/// see a multi-chunk stream.
const CHUNK_SIZE: usize = 4;

/// Scripted answer for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockResponse {
    /// Respond successfully with this body.
    Body(Vec<u8>),
    /// Respond with this status and no body. `200` is an empty body and
    /// `404` is a miss.
    Status(u16),
    /// Fail before answering, like a refused connection.
    Unreachable,
    /// Start a successful response, deliver these bytes, then fail.
    Truncated(Vec<u8>),
}

/// In-memory symbol source for testing.
///
/// Keys without a scripted response are answered as missing. Every request
/// is recorded, in order, so tests can assert which sources were asked.
///
/// # Examples
///
/// ```
/// use debuginfod_cache::{ArtifactType, CacheKey};
/// use debuginfod_source::{SymbolSource, backend::{MockResponse, MockSource}};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = MockSource::with_artifacts([("buildid/abc/debuginfo", b"DWARF")])
///     .with_response("buildid/abc/executable", MockResponse::Status(500));
/// let key = CacheKey::parse("ABC", ArtifactType::Debuginfo).unwrap();
/// assert!(source.fetch(&key).await.unwrap().is_found());
/// assert_eq!(source.requests().await, vec!["buildid/abc/debuginfo".to_string()]);
/// # }
/// ```
pub struct MockSource {
    name: String,
    responses: RwLock<HashMap<String, MockResponse>>,
    requests: RwLock<Vec<String>>,
}

impl MockSource {
    /// Create a mock source serving the given artifact bodies, keyed by
    /// request path (`buildid/<id>/<type>`).
    pub fn with_artifacts(artifacts: impl IntoIterator<Item = (impl Into<String>, impl AsRef<[u8]>)>) -> Self {
        let responses = artifacts
            .into_iter()
            .map(|(key, body)| (key.into(), MockResponse::Body(body.as_ref().to_vec())))
            .collect();
        Self {
            name: "mock".to_string(),
            responses: RwLock::new(responses),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Script the answer for one request path.
    pub fn with_response(mut self, key: impl Into<String>, response: MockResponse) -> Self {
        self.responses.get_mut().insert(key.into(), response);
        self
    }

    /// Change the name of the mock source.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Request paths received so far, oldest first.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    fn chunked(body: &[u8]) -> Vec<Result<Bytes>> {
        body.chunks(CHUNK_SIZE).map(|chunk| Ok(Bytes::copy_from_slice(chunk))).collect()
    }
}
impl Default for MockSource {
    fn default() -> Self {
        let artifacts: [(&str, &[u8]); 0] = [];
        Self::with_artifacts(artifacts)
    }
}

#[async_trait]
impl SymbolSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Fetch> {
        let request = key.to_string();
        self.requests.write().await.push(request.clone());
        let response = self.responses.read().await.get(&request).cloned();
        let chunks = match response {
            None | Some(MockResponse::Status(404)) => return Ok(Fetch::Missing),
            Some(MockResponse::Status(200)) => Vec::new(),
            Some(MockResponse::Status(status)) => {
                exn::bail!(ErrorKind::Status { url: format!("{}/{request}", self.name), status })
            },
            Some(MockResponse::Unreachable) => exn::bail!(ErrorKind::Network),
            Some(MockResponse::Body(body)) => Self::chunked(&body),
            Some(MockResponse::Truncated(partial)) => {
                let mut chunks = Self::chunked(&partial);
                chunks.push(Err(Error::from(ErrorKind::Network)));
                chunks
            },
        };
        let body: ByteStream = Box::pin(futures::stream::iter(chunks));
        Ok(Fetch::Found(body))
    }
}
