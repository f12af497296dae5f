//! worker_install, worker_activate and worker_status tool implementations.
//!
//! The host enforces ordering; these tools only deliver the event and report
//! the resulting state.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{CacheStorage, Network, WorkerHost};
use shellcache_core::CacheDb;

use super::json_result;

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    /// Lifecycle state after the event.
    pub state: String,
    /// Bucket the shell was written to.
    pub cache_name: String,
    /// Absolute URLs of the cached shell assets.
    pub assets: Vec<String>,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerActivateOutput {
    pub state: String,
    pub cache_name: String,
    /// Stale bucket names that were deleted.
    pub deleted: Vec<String>,
}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub state: String,
    pub origin: String,
    pub cache_name: String,
    pub offline_url: String,
    pub shell_assets: Vec<String>,
    /// Every bucket currently in storage.
    pub buckets: Vec<String>,
}

/// Implementation of the worker_install tool.
pub async fn install_impl<N: Network + 'static>(host: &WorkerHost<CacheDb, N>) -> Result<CallToolResult, McpError> {
    let assets = host.install().await?;

    json_result(&WorkerInstallOutput {
        state: host.state().await.to_string(),
        cache_name: host.worker().manifest().cache_name.clone(),
        assets: assets.iter().map(|u| u.to_string()).collect(),
    })
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl<N: Network + 'static>(host: &WorkerHost<CacheDb, N>) -> Result<CallToolResult, McpError> {
    let deleted = host.activate().await?;

    json_result(&WorkerActivateOutput {
        state: host.state().await.to_string(),
        cache_name: host.worker().manifest().cache_name.clone(),
        deleted,
    })
}

/// Implementation of the worker_status tool.
pub async fn status_impl<N: Network + 'static>(host: &WorkerHost<CacheDb, N>) -> Result<CallToolResult, McpError> {
    let manifest = host.worker().manifest();
    let buckets = host.worker().storage().keys().await?;

    json_result(&WorkerStatusOutput {
        state: host.state().await.to_string(),
        origin: host.origin().to_string(),
        cache_name: manifest.cache_name.clone(),
        offline_url: manifest.offline_url.clone(),
        shell_assets: manifest.shell_assets.clone(),
        buckets,
    })
}
