//! Configuration for the debuginfod client.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. a `debuginfod.{toml,yaml,yml,json}` file in each search path (the
//!    user config directory, then the current directory); an older
//!    `pydebuginfod.*` file next to it is read first and overridden,
//! 3. `DEBUGINFOD_*` environment variables.
//!
//! An optional symbol-server registry (`symbols.toml`) contributes extra
//! servers, which are tried before the configured `urls`.
//!
//! The result is a [`ResolvedConfig`]: one immutable snapshot that the
//! client is handed explicitly and never re-reads from the environment.

pub mod error;
mod loader;
mod registry;
mod resolved;

pub use crate::loader::{Config, ConfigLoader, DEFAULT_SERVER_URL};
pub use crate::registry::{Access, Registry, RegistryEntry};
pub use crate::resolved::{ResolvedConfig, ServerEndpoint, TransportPolicy};
