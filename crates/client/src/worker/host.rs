//! Lifecycle host for one worker version.
//!
//! Plays the part of the runtime: install before activate, never both at
//! once, and fetch events only reach a worker once it is activated.

use std::fmt;

use serde::{Deserialize, Serialize};
use shellcache_core::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use super::{FetchOutcome, ResponseSource, ShellWorker};
use crate::fetch::Network;
use crate::http::{Request, Response};
use crate::storage::CacheStorage;

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, no lifecycle event delivered yet.
    #[default]
    Parsed,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    /// Controlling pages; fetch events are intercepted.
    Activated,
    /// Install failed; this version will never activate.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response delivered to the page, whoever produced it.
#[derive(Debug)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
    pub store: Option<JoinHandle<()>>,
}

/// Delivers lifecycle and fetch events to a [`ShellWorker`].
pub struct WorkerHost<S, N> {
    worker: ShellWorker<S, N>,
    state: RwLock<WorkerState>,
    lifecycle: Mutex<()>,
}

impl<S, N> WorkerHost<S, N>
where
    S: CacheStorage + 'static,
    N: Network + 'static,
{
    pub fn new(worker: ShellWorker<S, N>) -> Self {
        Self { worker, state: RwLock::new(WorkerState::Parsed), lifecycle: Mutex::new(()) }
    }

    pub fn worker(&self) -> &ShellWorker<S, N> {
        &self.worker
    }

    pub fn origin(&self) -> &Url {
        self.worker.origin()
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
        tracing::info!(state = %state, cache = %self.worker.manifest().cache_name, "worker state changed");
    }

    /// Deliver the install event.
    ///
    /// Allowed from `Parsed`, or from `Redundant` to retry a failed install.
    /// On failure the worker becomes `Redundant`.
    pub async fn install(&self) -> Result<Vec<Url>, Error> {
        let _guard = self.lifecycle.lock().await;

        let state = self.state().await;
        if !matches!(state, WorkerState::Parsed | WorkerState::Redundant) {
            return Err(Error::InvalidState(format!("cannot install a worker that is {state}")));
        }

        self.set_state(WorkerState::Installing).await;
        match self.worker.on_install().await {
            Ok(urls) => {
                self.set_state(WorkerState::Installed).await;
                Ok(urls)
            }
            Err(e) => {
                tracing::warn!(error = %e, "install failed");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Deliver the activate event. Requires a completed install.
    ///
    /// On failure the worker stays `Installed` so activation can be retried.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let _guard = self.lifecycle.lock().await;

        let state = self.state().await;
        if state != WorkerState::Installed {
            return Err(Error::InvalidState(format!("cannot activate a worker that is {state}")));
        }

        self.set_state(WorkerState::Activating).await;
        match self.worker.on_activate().await {
            Ok(deleted) => {
                self.set_state(WorkerState::Activated).await;
                Ok(deleted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "activate failed");
                self.set_state(WorkerState::Installed).await;
                Err(e)
            }
        }
    }

    /// Bring the worker to `Activated`, running whichever lifecycle events
    /// are still outstanding.
    pub async fn register(&self) -> Result<(), Error> {
        match self.state().await {
            WorkerState::Activated => return Ok(()),
            WorkerState::Installed => {}
            _ => {
                self.install().await?;
            }
        }
        self.activate().await?;
        Ok(())
    }

    /// Deliver a fetch event. Until the worker is activated every request
    /// passes through.
    pub async fn fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        if self.state().await != WorkerState::Activated {
            return Ok(FetchOutcome::Passthrough(request));
        }
        self.worker.on_fetch(request).await
    }

    /// Deliver a fetch event and apply default handling to passthrough
    /// requests: a plain network fetch, never cached.
    pub async fn dispatch(&self, request: Request) -> Result<Served, Error> {
        match self.fetch(request).await? {
            FetchOutcome::Responded { response, source, store } => Ok(Served { response, source, store }),
            FetchOutcome::Passthrough(request) => {
                let response = self.worker.network().fetch(&request).await?;
                Ok(Served { response, source: ResponseSource::Passthrough, store: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{self, ScriptedNetwork};
    use reqwest::Method;
    use shellcache_core::CacheDb;

    async fn host() -> (WorkerHost<CacheDb, ScriptedNetwork>, std::sync::Arc<ScriptedNetwork>) {
        let (worker, _db, network) = testing::worker().await;
        network.route_shell(worker.manifest());
        (WorkerHost::new(worker), network)
    }

    #[tokio::test]
    async fn test_register_reaches_activated() {
        let (host, _network) = host().await;
        assert_eq!(host.state().await, WorkerState::Parsed);

        host.register().await.unwrap();
        assert_eq!(host.state().await, WorkerState::Activated);

        // Idempotent once active.
        host.register().await.unwrap();
        assert_eq!(host.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_failed_install_is_redundant_and_retryable() {
        let (host, network) = host().await;
        network.set_offline(true);

        assert!(matches!(host.install().await, Err(Error::InstallFailed(_))));
        assert_eq!(host.state().await, WorkerState::Redundant);
        assert!(matches!(host.activate().await, Err(Error::InvalidState(_))));

        network.set_offline(false);
        host.install().await.unwrap();
        assert_eq!(host.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let (host, _network) = host().await;
        assert!(matches!(host.activate().await, Err(Error::InvalidState(_))));
        assert_eq!(host.state().await, WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let (host, _network) = host().await;
        host.install().await.unwrap();
        assert!(matches!(host.install().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_fetch_passes_through_until_activated() {
        let (host, network) = host().await;
        let request = Request::get(testing::url("/portal/"));

        let outcome = host.fetch(request.clone()).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Passthrough(_)));

        host.register().await.unwrap();
        let outcome = host.fetch(request).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Responded { source: ResponseSource::Network, .. }));
        assert!(network.calls() > 0);
    }

    #[tokio::test]
    async fn test_dispatch_passthrough_uses_network_without_caching() {
        let (host, network) = host().await;
        host.register().await.unwrap();
        network.route(&format!("{}/portal/heartbeat/", testing::ORIGIN), 200, "ok");

        let request = Request::new(Method::POST, testing::url("/portal/heartbeat/"));
        let served = host.dispatch(request.clone()).await.unwrap();
        assert_eq!(served.source, ResponseSource::Passthrough);
        assert!(served.store.is_none());
        assert_eq!(served.response.body, "ok");

        let cached = host
            .worker()
            .storage()
            .match_request(&host.worker().manifest().cache_name, &request)
            .await
            .unwrap();
        assert!(cached.is_none());
    }
}
