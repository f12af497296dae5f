//! cache_get tool implementation.
//!
//! Retrieves a stored response by request URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::fetch::resolve;
use shellcache_client::{Network, Request, WorkerHost};
use shellcache_core::{CacheDb, Error};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL or a path on the worker origin.
    pub url: String,

    /// Bucket to read (default: the current bucket).
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub bucket: String,
    pub method: String,
    pub url: String,
    /// URL the response was served from, after redirects.
    pub final_url: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl<N: Network + 'static>(
    host: &WorkerHost<CacheDb, N>, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve(host.origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let bucket = params
        .bucket
        .unwrap_or_else(|| host.worker().manifest().cache_name.clone());

    let entry = host
        .worker()
        .storage()
        .match_entry(&bucket, &Request::get(url.clone()).key())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{url} in {bucket}")))?;

    json_result(&CacheGetOutput {
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        bucket: entry.bucket,
        method: entry.method,
        url: entry.url,
        final_url: entry.response_url,
        status_code: entry.status_code,
        headers: entry.headers,
        stored_at: entry.stored_at,
    })
}
