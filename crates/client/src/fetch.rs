//! Server fetch loop: ask each source in turn until one has the artifact.

use crate::download::download;
use crate::error::{Error, Result};
use crate::progress::Progress;
use debuginfod_cache::{Cache, CacheKey};
use debuginfod_config::TransportPolicy;
use debuginfod_source::SourceHandle;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Where a fetched artifact was placed, and which source provided it.
pub(crate) struct Fetched {
    pub(crate) path: PathBuf,
    pub(crate) source: String,
}

/// Try `sources` strictly in order.
///
/// - found: stop, the artifact is now cached;
/// - missing: move on to the next source;
/// - any other answer: stop with an error, later sources are never asked;
/// - unreachable: stop with an error, or with [`TransportPolicy::NextServer`]
///   move on and only report the failure if no later source has the
///   artifact either.
///
/// `Ok(None)` means every source that answered said it does not have it.
pub(crate) async fn fetch<W: Write>(
    sources: &[SourceHandle],
    cache: &Cache,
    key: &CacheKey,
    policy: TransportPolicy,
    progress: &mut Progress<W>,
) -> Result<Option<Fetched>> {
    let mut unreachable: Option<Error> = None;
    for source in sources {
        match download(source.as_ref(), cache, key, progress).await {
            Ok(Some(path)) => return Ok(Some(Fetched { path, source: source.name().to_string() })),
            Ok(None) => {},
            Err(err) if err.is_transport() && policy == TransportPolicy::NextServer => {
                warn!(source = source.name(), error = ?err, "Server unreachable, trying next server");
                unreachable = Some(err);
            },
            Err(err) => return Err(err),
        }
    }
    match unreachable {
        Some(err) => Err(err),
        None => {
            info!(key = %key, servers = sources.len(), "Not found on any server");
            Ok(None)
        },
    }
}
