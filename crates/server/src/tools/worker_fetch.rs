//! worker_fetch tool implementation.
//!
//! Delivers a fetch event for a URL, resolving root-relative paths against
//! the worker origin, and reports where the response came from.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::fetch::resolve;
use shellcache_client::{Method, Network, Request, WorkerHost};
use shellcache_core::{CacheDb, Error};

use super::json_result;

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path such as `/portal/` on the worker origin.
    pub url: String,

    /// HTTP method (default: GET). Only same-origin GETs are intercepted.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// The URL requested.
    pub url: String,
    /// The URL the response was served from.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// One of "network", "cache", "offline", "passthrough".
    pub source: String,
}

/// Implementation of the worker_fetch tool.
///
/// The background cache store of a network response is not awaited.
pub async fn fetch_impl<N: Network + 'static>(
    host: &WorkerHost<CacheDb, N>, params: WorkerFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|e| Error::InvalidInput(format!("invalid method {:?}: {e}", params.method)))?;
    let url = resolve(host.origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let served = host.dispatch(Request::new(method, url.clone())).await?;
    let response = served.response;

    tracing::debug!(url = %url, source = served.source.as_str(), status = response.status.as_u16(), "fetch served");

    json_result(&WorkerFetchOutput {
        url: url.to_string(),
        final_url: response.url.to_string(),
        status: response.status.as_u16(),
        content_type: response.content_type().map(str::to_string),
        headers: response
            .headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        source: served.source.as_str().to_string(),
    })
}
