//! Resolve debug artifacts by build-id.
//!
//! A [`Client`] checks the local cache first and, on a miss, asks each
//! configured symbol server in turn, streaming the first hit into the cache:
//!
//! ```no_run
//! use debuginfod_client::{Client, Resolution};
//! use debuginfod_config::{ResolvedConfig, ServerEndpoint};
//!
//! # async fn example() -> debuginfod_client::error::Result<()> {
//! let config = ResolvedConfig::new(
//!     "/home/me/.cache/debuginfod",
//!     [ServerEndpoint::http("https://debuginfod.elfutils.org/")],
//! );
//! let client = Client::new(config)?;
//! match client.debuginfo("c0e8c127f1f36dd10e77331f46b6e2dbbbdb219b").await? {
//!     Resolution::NotFound => println!("no server has it"),
//!     found => println!("{}", found.path().unwrap().display()),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod download;
pub mod error;
mod fetch;
mod progress;

pub use crate::client::{Client, Resolution};
pub use crate::progress::human_bytes;
pub use debuginfod_cache::ArtifactType;
