//! Streaming download of one artifact from one source into the cache.

use crate::error::{ErrorKind, Result};
use crate::progress::Progress;
use debuginfod_cache::{Cache, CacheKey, Staged};
use debuginfod_source::{ByteStream, Fetch, SymbolSource};
use exn::ResultExt;
use futures::TryStreamExt;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// Ask `source` for `key` and, if it has it, stream the body into `cache`.
///
/// Returns `Ok(None)` when the source does not have the artifact; nothing
/// is written to the cache in that case. The body goes to a private
/// temporary file next to the final entry and only appears at the entry's
/// path, whole, once the transfer has completed. If anything fails before
/// that, the temporary file is removed and the entry is left untouched.
#[instrument(skip_all, fields(source = source.name(), key = %key))]
pub(crate) async fn download<W: Write>(
    source: &dyn SymbolSource,
    cache: &Cache,
    key: &CacheKey,
    progress: &mut Progress<W>,
) -> Result<Option<PathBuf>> {
    let body = match source.fetch(key).await {
        Ok(Fetch::Found(body)) => body,
        Ok(Fetch::Missing) => {
            info!("Not found on server");
            return Ok(None);
        },
        Err(err) => return Err(ErrorKind::source(source.name(), err)),
    };

    let mut staged = cache.stage(key).await.or_raise(|| ErrorKind::Filesystem)?;
    info!(destination = %staged.destination().display(), "Downloading");
    let transferred = transfer(source, body, &mut staged, progress).await;
    progress.finish();
    transferred?;

    let size = staged.written();
    let path = staged.commit().await.or_raise(|| ErrorKind::Filesystem)?;
    debug!(path = %path.display(), size, "Download complete");
    Ok(Some(path))
}

async fn transfer<W: Write>(
    source: &dyn SymbolSource,
    mut body: ByteStream,
    staged: &mut Staged,
    progress: &mut Progress<W>,
) -> Result<()> {
    while let Some(chunk) = body.try_next().await.map_err(|err| ErrorKind::source(source.name(), err))? {
        staged.write(&chunk).await.or_raise(|| ErrorKind::Filesystem)?;
        progress.update(staged.written());
    }
    Ok(())
}
