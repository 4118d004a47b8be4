//! S3-compatible object storage as a symbol source.
//!
//! Artifacts are stored under the same layout debuginfod servers use, below
//! an optional key prefix: `[<prefix>/]buildid/<id>/<type>`.
//!
//! # Credentials
//!
//! A registry entry may carry its own `key-id` and `key-secret`. Without
//! them, the AWS default credential chain (environment, shared profile,
//! instance metadata) is used; it is resolved on the first request.

use crate::SymbolSource;
use crate::backend::{ByteStream, Fetch};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig, timeout::TimeoutConfig},
    error::SdkError,
    primitives::ByteStream as ObjectBody,
};
use debuginfod_cache::CacheKey;
use exn::ResultExt;
use std::time::Duration;
use tokio::sync::OnceCell;

/// How to build the S3 client on first use.
#[derive(Debug, Clone)]
struct Connection {
    region: String,
    endpoint: Option<String>,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
}
impl Connection {
    async fn connect(&self) -> Client {
        let builder = match &self.credentials {
            Some(credentials) => aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(credentials.clone()),
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            },
        };
        let mut timeouts = TimeoutConfig::builder();
        if let Some(timeout) = self.timeout {
            timeouts = timeouts.operation_timeout(timeout);
        }
        let mut builder = builder
            .region(Region::new(self.region.clone()))
            // Failures are surfaced once; the resolver never retries.
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeouts.build())
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = &self.endpoint {
            builder = builder.endpoint_url(endpoint_url);
        }
        Client::from_conf(builder.build())
    }
}

/// S3-compatible symbol source.
///
/// # Examples
///
/// ```no_run
/// use debuginfod_source::backend::S3Source;
///
/// // Explicit credentials, e.g. for Backblaze B2.
/// let b2 = S3Source::new(
///     "symbols-bucket",
///     Some("mirror".to_string()),
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com".to_string()),
///     Some("access_key_id".to_string()),
///     Some("secret_access_key".to_string()),
///     None,
/// );
/// // AWS default credential chain.
/// let aws = S3Source::new("symbols", None, "us-east-1", None, None, None, None);
/// ```
#[derive(Debug)]
pub struct S3Source {
    name: String,
    client: OnceCell<Client>,
    connection: Connection,
    bucket: String,
    prefix: Option<String>,
}

impl S3Source {
    /// Create a new S3 symbol source.
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id`, `key_secret` - Access key pair; when either is missing
    ///   the AWS default credential chain is used instead
    /// * `timeout` - Bound on each whole request; `None` waits indefinitely
    pub fn new(
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<String>,
        key_id: Option<String>,
        key_secret: Option<String>,
        timeout: Option<Duration>,
    ) -> Self {
        let credentials = match (key_id, key_secret) {
            (Some(key_id), Some(key_secret)) => {
                Some(Credentials::new(key_id, key_secret, None, None, "debuginfod-config"))
            },
            _ => None,
        };
        let connection = Connection { region: region.into(), endpoint, credentials, timeout };
        Self::build(bucket.into(), prefix, OnceCell::new(), connection)
    }

    /// Create a source around an already configured [`Client`].
    pub fn with_client(client: Client, bucket: impl Into<String>, prefix: Option<String>) -> Self {
        let connection = Connection {
            region: client.config().region().map(|r| r.to_string()).unwrap_or_default(),
            endpoint: None,
            credentials: None,
            timeout: None,
        };
        Self::build(bucket.into(), prefix, OnceCell::from(client), connection)
    }

    fn build(bucket: String, prefix: Option<String>, client: OnceCell<Client>, connection: Connection) -> Self {
        let prefix = prefix.map(|p| p.trim_matches('/').to_string()).filter(|p| !p.is_empty());
        let name = match &prefix {
            Some(prefix) => format!("s3://{bucket}/{prefix}"),
            None => format!("s3://{bucket}"),
        };
        Self { name, client, connection, bucket, prefix }
    }

    /// Object key for a cache key.
    fn object_key(&self, key: &CacheKey) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }

    fn body_stream(body: ObjectBody) -> ByteStream {
        Box::pin(futures::stream::unfold(body, |mut body| async move {
            let chunk = body.next().await?;
            Some((chunk.or_raise(|| ErrorKind::Network), body))
        }))
    }
}

#[async_trait]
impl SymbolSource for S3Source {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Fetch> {
        let object_key = self.object_key(key);
        tracing::info!(bucket = %self.bucket, key = %object_key, "Requesting artifact");
        let client = self.client.get_or_init(|| self.connection.connect()).await;
        let err = match client.get_object().bucket(&self.bucket).key(&object_key).send().await {
            Ok(output) => return Ok(Fetch::Found(Self::body_stream(output.body))),
            Err(err) => err,
        };
        let status = err.raw_response().map(|response| response.status().as_u16());
        if status == Some(404) || err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
            tracing::info!(bucket = %self.bucket, key = %object_key, "Not found");
            return Ok(Fetch::Missing);
        }
        let kind = match (&err, status) {
            (SdkError::TimeoutError(_), _) => ErrorKind::Timeout,
            (SdkError::DispatchFailure(_), _) => ErrorKind::Network,
            (_, Some(status)) => ErrorKind::Status { url: format!("{}/{object_key}", self.name), status },
            _ => ErrorKind::BackendError(format!("could not request {object_key}")),
        };
        Err(err).or_raise(|| kind)
    }
}
