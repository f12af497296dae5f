//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shellcache server. Tool
//! functions are generic over the network so tests can script it.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shellcache_client::{FetchClient, WorkerHost};
use shellcache_core::{CacheDb, Error};

pub mod cache;
pub mod worker_fetch;
pub mod worker_lifecycle;

#[cfg(test)]
pub(crate) mod test_support;

/// The host the server runs in production.
pub type Host = WorkerHost<CacheDb, FetchClient>;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
