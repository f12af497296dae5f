//! cache_list tool implementation.
//!
//! Lists bucket names, or the entries of a single bucket.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{Network, WorkerHost};
use shellcache_core::CacheDb;
use shellcache_core::cache::entries::EntrySummary;

use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// List this bucket's entries instead of the bucket names.
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Every bucket name (when no bucket was given).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<String>>,

    /// Entries of the requested bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntrySummary>>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl<N: Network + 'static>(
    host: &WorkerHost<CacheDb, N>, params: CacheListParams,
) -> Result<CallToolResult, McpError> {
    let db = host.worker().storage();

    let output = match params.bucket {
        Some(bucket) => CacheListOutput { buckets: None, entries: Some(db.list_entries(&bucket).await?) },
        None => CacheListOutput { buckets: Some(db.bucket_names().await?), entries: None },
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{self, output};

    #[tokio::test]
    async fn test_list_buckets_empty() {
        let (host, _network) = test_support::host().await;
        let out: CacheListOutput = output(&list_impl(&host, CacheListParams::default()).await.unwrap());
        assert_eq!(out.buckets, Some(vec![]));
        assert!(out.entries.is_none());
    }

    #[tokio::test]
    async fn test_list_entries_after_install() {
        let (host, _network) = test_support::host().await;
        host.install().await.unwrap();

        let params = CacheListParams { bucket: Some("shell-cache-v1".into()) };
        let out: CacheListOutput = output(&list_impl(&host, params).await.unwrap());
        let entries = out.entries.unwrap();
        assert_eq!(entries.len(), host.worker().manifest().shell_assets.len());
        assert!(entries.iter().all(|e| e.method == "GET" && e.status_code == 200));
    }
}
