//! Cache inspection MCP tools.
//!
//! Read-only views of the bucket store; writes only happen through worker
//! lifecycle and fetch events.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::{CacheListParams, list_impl};
