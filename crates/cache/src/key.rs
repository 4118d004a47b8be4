//! Cache addressing.
//!
//! A [`CacheKey`] is the pair of a normalized [`BuildId`] and an
//! [`ArtifactType`]. The same three segments (`buildid`, id, type) address
//! the file below the cache root and the resource on every symbol server.

use crate::error::{Error, ErrorKind, Result};
use derive_more::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Leading segment shared by cache paths and server request paths.
pub const BUILDID_SEGMENT: &str = "buildid";

/// Hexadecimal build identifier, always stored in lowercase.
///
/// Two ids that differ only in case are the same id, so normalization
/// happens once, here, before any path or URL is built.
///
/// ```
/// use debuginfod_cache::BuildId;
///
/// let upper = BuildId::parse("ABC123").unwrap();
/// let lower = BuildId::parse("abc123").unwrap();
/// assert_eq!(upper, lower);
/// assert_eq!(upper.as_str(), "abc123");
/// assert!(BuildId::parse("../etc").is_err());
/// ```
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
pub struct BuildId(String);
impl BuildId {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        // Hex digits only: guarantees the id is a single, harmless path
        // component and needs no escaping in a URL.
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            exn::bail!(ErrorKind::InvalidBuildId(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl FromStr for BuildId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
impl AsRef<str> for BuildId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which sub-resource of a build to fetch.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ArtifactType {
    /// Separated debug information.
    #[display("debuginfo")]
    Debuginfo,
    /// The (possibly stripped) executable or shared object.
    #[display("executable")]
    Executable,
}
impl ArtifactType {
    pub const ALL: [ArtifactType; 2] = [Self::Debuginfo, Self::Executable];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debuginfo => "debuginfo",
            Self::Executable => "executable",
        }
    }
}
impl FromStr for ArtifactType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|artifact| artifact.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::from(ErrorKind::UnknownArtifact(s.to_string())))
    }
}

/// Deterministic address of one artifact.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
#[display("{}/{}/{}", BUILDID_SEGMENT, build_id, artifact)]
pub struct CacheKey {
    pub build_id: BuildId,
    pub artifact: ArtifactType,
}
impl CacheKey {
    pub fn new(build_id: BuildId, artifact: ArtifactType) -> Self {
        Self { build_id, artifact }
    }

    /// Parse and normalize a raw build-id into a key.
    pub fn parse(build_id: impl AsRef<str>, artifact: ArtifactType) -> Result<Self> {
        Ok(Self::new(BuildId::parse(build_id)?, artifact))
    }

    /// The path segments, in order: `["buildid", <id>, <type>]`.
    pub fn segments(&self) -> [&str; 3] {
        [BUILDID_SEGMENT, self.build_id.as_str(), self.artifact.as_str()]
    }

    /// Location relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        self.segments().iter().collect()
    }
}
