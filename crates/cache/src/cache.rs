//! Local cache directory.

use crate::error::{ErrorKind, Result};
use crate::key::CacheKey;
use crate::staged::Staged;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Cache rooted at a local directory.
///
/// # Examples
///
/// ```no_run
/// use debuginfod_cache::{ArtifactType, Cache, CacheKey};
///
/// # async fn example() -> debuginfod_cache::error::Result<()> {
/// let cache = Cache::new("/home/me/.cache/debuginfod")?;
/// let key = CacheKey::parse("C0E8C127", ArtifactType::Debuginfo)?;
/// match cache.lookup(&key).await {
///     Some(path) => println!("cached at {}", path.display()),
///     None => println!("not cached yet"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Cache {
    root: PathBuf,
}
impl Cache {
    /// Create a cache handle, making the root absolute.
    ///
    /// Creating the root directory is best-effort: a failure is only logged.
    /// Every write path ([`stage`](Self::stage)) creates the directories it
    /// needs again and reports its own failure.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = std::path::absolute(root).or_raise(|| ErrorKind::InvalidPath(root.to_path_buf()))?;
        // Use non-async here; it'll only happen once on client initialization
        // and it's not worth the hassle of making the constructor async.
        if let Err(err) = sync_create_dir(&root) {
            tracing::debug!(root = %root.display(), error = %err, "Could not create cache root; continuing");
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of an entry, whether or not it exists.
    pub fn path_of(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Return the path of the entry if a regular file exists there.
    ///
    /// A miss is not an error: anything that prevents reading the entry's
    /// metadata counts as "not cached".
    pub async fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.path_of(key);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {
                tracing::info!(key = %key, "Found in cache");
                Some(path)
            },
            Ok(_) => {
                tracing::debug!(path = %path.display(), "Cache entry exists but is not a regular file");
                None
            },
            Err(err) => {
                tracing::trace!(path = %path.display(), error = %err, "Cache miss");
                None
            },
        }
    }

    /// Open a private temporary file next to the entry's final location.
    ///
    /// Missing parent directories are created here (and any failure is
    /// surfaced). The temporary file lives in the same directory as the
    /// destination so that [`Staged::commit`] is a same-filesystem rename.
    pub async fn stage(&self, key: &CacheKey) -> Result<Staged> {
        let destination = self.path_of(key);
        let parent = destination.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&parent).await.map_err(|e| ErrorKind::from_io(e, &parent))?;
        Staged::create(&parent, destination).await
    }

    /// Recursively delete the whole cache root.
    ///
    /// Clearing a cache whose root does not exist is a no-op.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                tracing::info!(root = %self.root.display(), "Cache cleared");
                Ok(())
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ErrorKind::from_io(err, &self.root).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ArtifactType;

    const BUILD_ID: &str = "c0e8c127f1f36dd10e77331f46b6e2dbbbdb219b";

    fn key(artifact: ArtifactType) -> CacheKey {
        CacheKey::parse(BUILD_ID, artifact).unwrap()
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nested/cache");
        let cache = Cache::new(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(cache.root(), root);
    }

    #[test]
    fn test_new_tolerates_uncreatable_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        // Root below a regular file can never be created, but construction
        // still succeeds.
        let cache = Cache::new(blocker.join("cache")).unwrap();
        assert!(!cache.root().exists());
    }

    #[test]
    fn test_path_of_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(temp_dir.path()).unwrap();
        let expected = temp_dir.path().join("buildid").join(BUILD_ID).join("debuginfo");
        assert_eq!(cache.path_of(&key(ArtifactType::Debuginfo)), expected);
        let upper = CacheKey::parse(BUILD_ID.to_uppercase(), ArtifactType::Debuginfo).unwrap();
        assert_eq!(cache.path_of(&upper), expected);
    }

    #[tokio::test]
    async fn test_lookup_miss_and_hit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(temp_dir.path()).unwrap();
        let key = key(ArtifactType::Executable);
        assert!(cache.lookup(&key).await.is_none());
        let path = cache.path_of(&key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"ELF").unwrap();
        assert_eq!(cache.lookup(&key).await, Some(path));
        // The other artifact of the same build is still a miss
        assert!(cache.lookup(&self::key(ArtifactType::Debuginfo)).await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_ignores_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(temp_dir.path()).unwrap();
        let key = key(ArtifactType::Debuginfo);
        std::fs::create_dir_all(cache.path_of(&key)).unwrap();
        assert!(cache.lookup(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("cache");
        let cache = Cache::new(&root).unwrap();
        let key = key(ArtifactType::Debuginfo);
        let mut staged = cache.stage(&key).await.unwrap();
        staged.write(b"DWARF").await.unwrap();
        staged.commit().await.unwrap();
        assert!(cache.lookup(&key).await.is_some());
        cache.clear().await.unwrap();
        assert!(cache.lookup(&key).await.is_none());
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_clear_missing_root_is_noop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(temp_dir.path().join("cache")).unwrap();
        cache.clear().await.unwrap();
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_stage_recreates_cleared_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(temp_dir.path().join("cache")).unwrap();
        cache.clear().await.unwrap();
        let key = key(ArtifactType::Executable);
        let mut staged = cache.stage(&key).await.unwrap();
        staged.write(b"ELF").await.unwrap();
        assert_eq!(staged.commit().await.unwrap(), cache.path_of(&key));
    }

    #[tokio::test]
    async fn test_stage_surfaces_directory_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let cache = Cache::new(&blocker).unwrap();
        assert!(cache.stage(&key(ArtifactType::Debuginfo)).await.is_err());
    }
}
