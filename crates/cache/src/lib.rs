//! On-disk cache of debug artifacts.
//!
//! Every artifact lives at exactly one place below the cache root:
//!
//! ```text
//! <root>/buildid/<lowercase build-id>/<debuginfo|executable>
//! ```
//!
//! There is no content hashing, no versioning and no staleness check: if the
//! file is there, it is valid. Files only ever appear at that path through an
//! atomic rename of a fully written [`Staged`] download, so a reader can never
//! observe a partial artifact.

mod cache;
pub mod error;
mod key;
mod staged;

pub use crate::cache::Cache;
pub use crate::key::{ArtifactType, BuildId, CacheKey};
pub use crate::staged::Staged;
