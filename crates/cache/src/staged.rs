use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// An artifact being written, invisible at its final cache location.
///
/// Dropping a `Staged` without calling [`commit`](Self::commit) deletes the
/// temporary file, so an interrupted download never leaves anything behind
/// at the destination.
pub struct Staged {
    temp: NamedTempFile,
    file: tokio::fs::File,
    destination: PathBuf,
    written: u64,
}
impl Staged {
    pub(crate) async fn create(dir: &Path, destination: PathBuf) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| ErrorKind::from_io(e, dir))?;
        let handle = temp.as_file().try_clone().map_err(ErrorKind::Io)?;
        tracing::trace!(temp = %temp.path().display(), destination = %destination.display(), "Staging download");
        Ok(Self {
            temp,
            file: tokio::fs::File::from_std(handle),
            destination,
            written: 0,
        })
    }

    /// Append a chunk to the temporary file.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await.map_err(|e| ErrorKind::from_io(e, self.temp.path()))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Total bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Flush everything to disk, then atomically rename the temporary file
    /// onto the destination (replacing any existing entry wholesale).
    pub async fn commit(mut self) -> Result<PathBuf> {
        self.file.flush().await.map_err(ErrorKind::Io)?;
        self.file.sync_all().await.map_err(ErrorKind::Io)?;
        let Self { temp, file, destination, written } = self;
        // Our duplicate handle must be closed before the rename on Windows.
        drop(file);
        temp.persist(&destination).map_err(|e| ErrorKind::from_io(e.error, &destination))?;
        tracing::debug!(destination = %destination.display(), bytes = written, "Download placed in cache");
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use crate::{ArtifactType, Cache, CacheKey};

    fn entries(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(dir).unwrap().map(|entry| entry.unwrap().path()).collect()
    }

    #[tokio::test]
    async fn test_commit_places_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(temp_dir.path()).unwrap();
        let key = CacheKey::parse("abc123", ArtifactType::Debuginfo).unwrap();
        let mut staged = cache.stage(&key).await.unwrap();
        assert_eq!(staged.destination(), cache.path_of(&key));
        staged.write(b"hello ").await.unwrap();
        staged.write(b"world").await.unwrap();
        assert_eq!(staged.written(), 11);
        // Nothing visible until commit
        assert!(!cache.path_of(&key).exists());
        let path = staged.commit().await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
        // Only the final file remains, no temporary leftovers
        assert_eq!(entries(path.parent().unwrap()), vec![path]);
    }

    #[tokio::test]
    async fn test_drop_without_commit_leaves_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(temp_dir.path()).unwrap();
        let key = CacheKey::parse("abc123", ArtifactType::Executable).unwrap();
        let mut staged = cache.stage(&key).await.unwrap();
        staged.write(b"partial").await.unwrap();
        let parent = staged.destination().parent().unwrap().to_path_buf();
        drop(staged);
        assert!(!cache.path_of(&key).exists());
        assert!(entries(&parent).is_empty());
        assert!(cache.lookup(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_commit_replaces_existing_entry() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(temp_dir.path()).unwrap();
        let key = CacheKey::parse("abc123", ArtifactType::Executable).unwrap();
        let mut first = cache.stage(&key).await.unwrap();
        first.write(b"old contents").await.unwrap();
        first.commit().await.unwrap();
        let mut second = cache.stage(&key).await.unwrap();
        second.write(b"new").await.unwrap();
        let path = second.commit().await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"new");
    }
}
