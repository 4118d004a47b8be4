pub mod backend;
pub mod error;

pub use crate::backend::{ByteStream, Fetch, SymbolSource};
use std::sync::Arc;

pub type SourceHandle = Arc<dyn SymbolSource + Send + Sync>;
