use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What to do when a server cannot be reached at all (connection refused,
/// DNS failure, timeout).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportPolicy {
    /// Stop resolving and report the failure.
    #[default]
    Abort,
    /// Log the failure and move on to the next server.
    #[serde(alias = "next")]
    NextServer,
}

/// One configured place to fetch artifacts from.
///
/// Order matters: servers are tried first to last.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEndpoint {
    /// A debuginfod HTTP(S) server.
    Http { url: String },
    /// An S3-compatible bucket laid out like a debuginfod server.
    #[serde(rename_all = "kebab-case")]
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default = "default_region")]
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        /// Without a key pair, the AWS default credential chain is used.
        #[serde(default)]
        key_id: Option<String>,
        #[serde(default)]
        key_secret: Option<String>,
    },
}
impl ServerEndpoint {
    pub fn http(url: impl Into<String>) -> Self {
        Self::Http { url: url.into() }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Fully resolved, immutable configuration snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Directory under which `buildid/<id>/<type>` entries are stored.
    pub cache_root: PathBuf,
    /// Servers in fallback priority order.
    pub servers: Vec<ServerEndpoint>,
    /// Bound on each whole request. `None` means wait indefinitely.
    pub timeout: Option<Duration>,
    /// Draw a download progress line on standard output.
    pub show_progress: bool,
    pub transport_policy: TransportPolicy,
}
impl ResolvedConfig {
    /// Snapshot with the given servers, no timeout and no progress output.
    pub fn new(cache_root: impl Into<PathBuf>, servers: impl IntoIterator<Item = ServerEndpoint>) -> Self {
        Self {
            cache_root: cache_root.into(),
            servers: servers.into_iter().collect(),
            timeout: None,
            show_progress: false,
            transport_policy: TransportPolicy::Abort,
        }
    }

    pub fn with_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_transport_policy(mut self, policy: TransportPolicy) -> Self {
        self.transport_policy = policy;
        self
    }
}
