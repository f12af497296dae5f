//! The Shell Cache Worker.
//!
//! Three handlers, each awaited by the host before it moves on:
//!
//! - `on_install` pre-populates the current bucket with the shell assets
//!   (all or nothing).
//! - `on_activate` deletes every bucket except the current one.
//! - `on_fetch` serves same-origin GETs network-first, stores ok responses in
//!   the background, and falls back to the exact cache entry and then the
//!   offline page when the network rejects.
//!
//! Handlers keep no state between invocations; everything shared goes
//! through the bucket.

mod host;
#[cfg(test)]
pub(crate) mod testing;

pub use host::{Served, WorkerHost, WorkerState};

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, Manifest};
use tokio::task::JoinHandle;
use url::Url;

use crate::fetch::{Network, resolve, same_origin};
use crate::http::{Request, Response};
use crate::storage::CacheStorage;

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// Live network response.
    Network,
    /// Exact cache match after the network rejected.
    Cache,
    /// Offline fallback page after the network rejected.
    Offline,
    /// Not intercepted; fetched by the host's default handling.
    Passthrough,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Offline => "offline",
            Self::Passthrough => "passthrough",
        }
    }
}

/// Result of delivering a fetch event to the worker.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The worker declined the request; the host handles it as usual.
    Passthrough(Request),
    /// The worker produced a response.
    Responded {
        response: Response,
        source: ResponseSource,
        /// Background store of a network response. Dropping the handle
        /// detaches the task; awaiting it waits for the write to settle.
        store: Option<JoinHandle<()>>,
    },
}

/// One worker version bound to its storage, network and origin.
pub struct ShellWorker<S, N> {
    storage: Arc<S>,
    network: Arc<N>,
    origin: Url,
    manifest: Manifest,
}

impl<S, N> ShellWorker<S, N>
where
    S: CacheStorage + 'static,
    N: Network + 'static,
{
    pub fn new(storage: Arc<S>, network: Arc<N>, origin: Url, manifest: Manifest) -> Self {
        Self { storage, network, origin, manifest }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn network(&self) -> &Arc<N> {
        &self.network
    }

    /// Open the current bucket and fill it with every shell asset.
    ///
    /// Assets are fetched concurrently. Any rejection or non-ok status fails
    /// the install and nothing is written; on success all assets are stored
    /// in one batch. Returns the cached asset URLs in manifest order.
    pub async fn on_install(&self) -> Result<Vec<Url>, Error> {
        let bucket = &self.manifest.cache_name;
        self.storage.open(bucket).await?;

        let mut urls = Vec::with_capacity(self.manifest.shell_assets.len());
        for asset in &self.manifest.shell_assets {
            let url = resolve(&self.origin, asset).map_err(|e| Error::InstallFailed(format!("{asset}: {e}")))?;
            urls.push(url);
        }

        let pairs = try_join_all(urls.iter().map(|url| self.fetch_asset(url))).await?;

        self.storage
            .put_all(bucket, &pairs)
            .await
            .map_err(|e| Error::InstallFailed(format!("storing shell assets: {e}")))?;

        tracing::info!(bucket = %bucket, assets = pairs.len(), "shell cached");
        Ok(urls)
    }

    async fn fetch_asset(&self, url: &Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url.clone());
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed(format!("{url}: {e}")))?;

        if !response.ok() {
            return Err(Error::InstallFailed(format!("{url}: status {}", response.status.as_u16())));
        }

        Ok((request, response))
    }

    /// Delete every bucket whose name is not the current one.
    ///
    /// Deletions run concurrently and are all awaited; a failure in one does
    /// not stop the others. Returns the deleted names.
    pub async fn on_activate(&self) -> Result<Vec<String>, Error> {
        let current = &self.manifest.cache_name;
        let names = self
            .storage
            .keys()
            .await
            .map_err(|e| Error::ActivateFailed(format!("listing buckets: {e}")))?;

        let stale: Vec<String> = names.into_iter().filter(|name| name != current).collect();
        let results = join_all(stale.iter().map(|name| self.storage.delete(name))).await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(_) => deleted.push(name),
                Err(e) => {
                    tracing::warn!(bucket = %name, error = %e, "failed to delete stale bucket");
                    failed.push(format!("{name}: {e}"));
                }
            }
        }

        if !failed.is_empty() {
            return Err(Error::ActivateFailed(failed.join("; ")));
        }

        tracing::info!(current = %current, deleted = ?deleted, "stale buckets purged");
        Ok(deleted)
    }

    /// Handle an intercepted request.
    ///
    /// Non-GET and cross-origin requests come back as `Passthrough`.
    pub async fn on_fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        if request.method != Method::GET {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepting non-GET");
            return Ok(FetchOutcome::Passthrough(request));
        }
        if !same_origin(&request.url, &self.origin) {
            tracing::debug!(url = %request.url, "not intercepting cross-origin request");
            return Ok(FetchOutcome::Passthrough(request));
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                let store = response.ok().then(|| self.spawn_store(request.clone(), response.clone()));
                Ok(FetchOutcome::Responded { response, source: ResponseSource::Network, store })
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "network rejected, trying cache");
                self.fallback(&request).await
            }
        }
    }

    async fn fallback(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Some(response) = self.lookup(request).await {
            return Ok(FetchOutcome::Responded { response, source: ResponseSource::Cache, store: None });
        }

        let offline_url = resolve(&self.origin, &self.manifest.offline_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.manifest.offline_url)))?;
        if let Some(response) = self.lookup(&Request::get(offline_url)).await {
            return Ok(FetchOutcome::Responded { response, source: ResponseSource::Offline, store: None });
        }

        Err(Error::OfflineUnavailable(request.url.to_string()))
    }

    /// Cache lookup in the current bucket; storage errors count as a miss.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.storage.match_request(&self.manifest.cache_name, request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Best-effort store of a network response. Runs detached from the
    /// response delivery; failures are logged and dropped, never retried.
    fn spawn_store(&self, request: Request, response: Response) -> JoinHandle<()> {
        let storage = Arc::clone(&self.storage);
        let bucket = self.manifest.cache_name.clone();
        tokio::spawn(async move {
            match storage.put(&bucket, &request, &response).await {
                Ok(()) => tracing::debug!(url = %request.url, "cached network response"),
                Err(e) => tracing::warn!(url = %request.url, error = %e, "background cache store failed"),
            }
        })
    }
}
