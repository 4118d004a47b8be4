use crate::error::{ErrorKind, Result};
use crate::fetch::{Fetched, fetch};
use crate::progress::Progress;
use debuginfod_cache::{ArtifactType, Cache, CacheKey};
use debuginfod_config::{ResolvedConfig, ServerEndpoint, TransportPolicy};
use debuginfod_source::SourceHandle;
use debuginfod_source::backend::HttpSource;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Outcome of resolving one artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Already in the cache; no server was contacted.
    Cached(PathBuf),
    /// Downloaded from `source` into the cache.
    Fetched { path: PathBuf, source: String },
    /// No server has the artifact. Nothing was written to the cache.
    NotFound,
}
impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Cached(path) | Self::Fetched { path, .. } => Some(path),
            Self::NotFound => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Cached(path) | Self::Fetched { path, .. } => Some(path),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

/// Fetch-or-cache resolver over an ordered list of symbol sources.
///
/// Each call is independent and linear: the cache is checked, then the
/// sources are asked one after the other, never concurrently. Several
/// clients (or processes) may share a cache root; an entry only ever
/// appears through an atomic rename, so the worst a race can cost is a
/// redundant download.
pub struct Client {
    cache: Cache,
    sources: Vec<SourceHandle>,
    transport_policy: TransportPolicy,
    show_progress: bool,
}

impl Client {
    /// Build a client, and one source per configured server, from a
    /// resolved configuration snapshot.
    ///
    /// The cache root is created if possible; failing to do so is not an
    /// error here, it surfaces on the first download instead.
    pub fn new(config: ResolvedConfig) -> Result<Self> {
        let cache = Cache::new(&config.cache_root).or_raise(|| ErrorKind::Filesystem)?;
        let sources = config
            .servers
            .iter()
            .map(|endpoint| build_source(endpoint, config.timeout))
            .collect::<Result<Vec<_>>>()?;
        debug!(cache = %cache.root().display(), servers = sources.len(), "Client ready");
        Ok(Self::with_sources(cache, sources)
            .with_transport_policy(config.transport_policy)
            .with_progress(config.show_progress))
    }

    /// Build a client over already constructed sources, in priority order.
    ///
    /// Progress output is off and transport failures abort.
    pub fn with_sources(cache: Cache, sources: impl IntoIterator<Item = SourceHandle>) -> Self {
        Self {
            cache,
            sources: sources.into_iter().collect(),
            transport_policy: TransportPolicy::default(),
            show_progress: false,
        }
    }

    pub fn with_transport_policy(mut self, policy: TransportPolicy) -> Self {
        self.transport_policy = policy;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn cache_root(&self) -> &Path {
        self.cache.root()
    }

    /// Names of the configured sources, in the order they are tried.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|source| source.name())
    }

    /// Cache-only lookup. Never contacts a server.
    pub async fn lookup(&self, build_id: &str, artifact: ArtifactType) -> Result<Option<PathBuf>> {
        let key = cache_key(build_id, artifact)?;
        Ok(self.cache.lookup(&key).await)
    }

    /// Return the local path of an artifact, downloading it on a cache miss.
    ///
    /// # Errors
    /// - [`InvalidBuildId`](ErrorKind::InvalidBuildId) before anything else
    ///   happens,
    /// - [`Server`](ErrorKind::Server) as soon as a server gives an answer
    ///   other than the artifact or "not found",
    /// - [`Transport`](ErrorKind::Transport) when a server cannot be reached
    ///   (see [`TransportPolicy`]),
    /// - [`Filesystem`](ErrorKind::Filesystem) when the artifact cannot be
    ///   written into the cache.
    pub async fn resolve(&self, build_id: &str, artifact: ArtifactType) -> Result<Resolution> {
        let key = cache_key(build_id, artifact)?;
        if let Some(path) = self.cache.lookup(&key).await {
            return Ok(Resolution::Cached(path));
        }
        let mut progress = Progress::stdout(self.show_progress);
        let resolution = match fetch(&self.sources, &self.cache, &key, self.transport_policy, &mut progress).await? {
            Some(Fetched { path, source }) => Resolution::Fetched { path, source },
            None => Resolution::NotFound,
        };
        Ok(resolution)
    }

    pub async fn debuginfo(&self, build_id: &str) -> Result<Resolution> {
        self.resolve(build_id, ArtifactType::Debuginfo).await
    }

    pub async fn executable(&self, build_id: &str) -> Result<Resolution> {
        self.resolve(build_id, ArtifactType::Executable).await
    }

    /// Delete the entire cache root. Clearing an absent cache is a no-op.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await.or_raise(|| ErrorKind::Filesystem)
    }
}

fn cache_key(build_id: &str, artifact: ArtifactType) -> Result<CacheKey> {
    CacheKey::parse(build_id, artifact).or_raise(|| ErrorKind::InvalidBuildId(build_id.to_string()))
}

fn build_source(endpoint: &ServerEndpoint, timeout: Option<Duration>) -> Result<SourceHandle> {
    match endpoint {
        ServerEndpoint::Http { url } => {
            let source = HttpSource::new(url, timeout).or_raise(|| ErrorKind::Source)?;
            Ok(Arc::new(source))
        },
        #[cfg(feature = "s3")]
        ServerEndpoint::S3 { bucket, prefix, region, endpoint, key_id, key_secret } => {
            Ok(Arc::new(debuginfod_source::backend::S3Source::new(
                bucket,
                prefix.clone(),
                region,
                endpoint.clone(),
                key_id.clone(),
                key_secret.clone(),
                timeout,
            )))
        },
        #[cfg(not(feature = "s3"))]
        ServerEndpoint::S3 { bucket, .. } => {
            tracing::error!(bucket = bucket.as_str(), "S3 servers need the `s3` feature");
            exn::bail!(ErrorKind::Source)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debuginfod_source::backend::MockSource;

    fn mock(name: &str) -> SourceHandle {
        Arc::new(MockSource::default().with_name(name))
    }

    #[test]
    fn test_new_builds_sources_in_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ResolvedConfig::new(
            temp_dir.path(),
            [ServerEndpoint::http("https://a.example/"), ServerEndpoint::http("http://b.example:8002/symbols")],
        );
        let client = Client::new(config).unwrap();
        assert_eq!(client.sources().collect::<Vec<_>>(), vec!["https://a.example/", "http://b.example:8002/symbols"]);
        assert_eq!(client.cache_root(), temp_dir.path());
    }

    #[test]
    fn test_new_rejects_unusable_server() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ResolvedConfig::new(temp_dir.path(), [ServerEndpoint::http("not a url")]);
        let err = Client::new(config).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Source));
    }

    fn bucket_only() -> ServerEndpoint {
        ServerEndpoint::S3 {
            bucket: "symbols".to_string(),
            prefix: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            key_id: None,
            key_secret: None,
        }
    }

    #[cfg(feature = "s3")]
    #[test]
    fn test_new_accepts_bucket_without_credentials() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ResolvedConfig::new(temp_dir.path(), [bucket_only(), ServerEndpoint::http("https://a.example/")]);
        let client = Client::new(config).unwrap();
        assert_eq!(client.sources().collect::<Vec<_>>(), vec!["s3://symbols", "https://a.example/"]);
    }

    #[cfg(not(feature = "s3"))]
    #[test]
    fn test_new_rejects_bucket_without_s3_support() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ResolvedConfig::new(temp_dir.path(), [bucket_only()]);
        let err = Client::new(config).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Source));
    }

    #[test]
    fn test_new_tolerates_uncreatable_cache_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let config = ResolvedConfig::new(blocker.join("cache"), []);
        assert!(Client::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_build_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        let client = Client::with_sources(Cache::new(temp_dir.path()).unwrap(), [mock("s1")]);
        let err = client.debuginfo("not-hex!").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidBuildId(id) if id == "not-hex!"));
    }

    #[tokio::test]
    async fn test_lookup_never_contacts_servers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = Arc::new(MockSource::with_artifacts([("buildid/ab/debuginfo", b"x")]));
        let client = Client::with_sources(Cache::new(temp_dir.path()).unwrap(), [source.clone() as SourceHandle]);
        assert!(client.lookup("AB", ArtifactType::Debuginfo).await.unwrap().is_none());
        assert!(source.requests().await.is_empty());
    }

    #[test]
    fn test_resolution_paths() {
        let path = PathBuf::from("/cache/buildid/ab/debuginfo");
        assert_eq!(Resolution::Cached(path.clone()).path(), Some(path.as_path()));
        let fetched = Resolution::Fetched { path: path.clone(), source: "s1".to_string() };
        assert!(fetched.is_found());
        assert_eq!(fetched.into_path(), Some(path));
        assert!(!Resolution::NotFound.is_found());
        assert_eq!(Resolution::NotFound.into_path(), None);
    }
}
