use crate::error::{ErrorKind, Result};
use crate::resolved::ServerEndpoint;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Format, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Whether a registered server may be read from, written to, or both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    #[default]
    Read,
    Write,
    ReadWrite,
}
impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(default)]
    pub access: Access,
    #[serde(flatten)]
    pub endpoint: ServerEndpoint,
}

/// Symbol-server registry, read from a `symbols.toml` file:
///
/// ```toml
/// [[servers]]
/// type = "s3"
/// bucket = "symbols"
/// # Optional; the AWS default credential chain is used otherwise.
/// key-id = "..."
/// key-secret = "..."
///
/// [[servers]]
/// type = "http"
/// url = "https://debuginfod.example.com/"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub servers: Vec<RegistryEntry>,
}
impl Registry {
    /// Load the registry at `path`. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            debug!(path = %path.display(), "No server registry");
            return Ok(Self::default());
        }
        let registry: Self = Figment::from(Toml::file(path))
            .extract()
            .or_raise(|| ErrorKind::Registry(path.to_path_buf()))?;
        debug!(path = %path.display(), servers = registry.servers.len(), "Loaded server registry");
        Ok(registry)
    }

    /// Endpoints that may be fetched from, in registry order.
    pub fn readable(&self) -> impl Iterator<Item = &ServerEndpoint> {
        self.servers
            .iter()
            .filter(|entry| entry.access.readable())
            .map(|entry| &entry.endpoint)
    }
}
