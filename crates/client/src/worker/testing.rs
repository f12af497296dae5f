//! Scripted network and storage for worker tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use shellcache_core::{CacheDb, Error, Manifest};
use url::Url;

use super::ShellWorker;
use crate::fetch::Network;
use crate::http::{Request, Response};
use crate::storage::CacheStorage;

pub const ORIGIN: &str = "http://localhost:8000";

/// Serves canned responses by URL; unknown URLs and offline mode reject.
#[derive(Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, (StatusCode, Bytes)>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn route(&self, url: &str, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, Bytes::from(body.to_string())));
    }

    /// Route every manifest asset under `origin` with a 200.
    pub fn route_shell(&self, manifest: &Manifest) {
        for asset in &manifest.shell_assets {
            self.route(&format!("{ORIGIN}{asset}"), 200, &format!("asset {asset}"));
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }

        let routes = self.routes.lock().unwrap();
        let (status, body) = routes
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("no route to {}", request.url)))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        Ok(Response { url: request.url.clone(), status, headers, body })
    }
}

/// In-memory `CacheDb` that fails the operations it is told to.
pub struct FaultyStorage {
    db: CacheDb,
    failing_deletes: Mutex<HashSet<String>>,
    failing_matches: Mutex<HashSet<String>>,
    fail_puts: AtomicBool,
}

impl FaultyStorage {
    pub async fn new() -> Self {
        Self {
            db: CacheDb::open_in_memory().await.unwrap(),
            failing_deletes: Mutex::default(),
            failing_matches: Mutex::default(),
            fail_puts: AtomicBool::new(false),
        }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn fail_delete(&self, bucket: &str) {
        self.failing_deletes.lock().unwrap().insert(bucket.to_string());
    }

    /// Fail lookups of `url` in any bucket.
    pub fn fail_match(&self, url: &str) {
        self.failing_matches.lock().unwrap().insert(url.to_string());
    }

    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    fn check_put(&self, bucket: &str) -> Result<(), Error> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::CorruptEntry(format!("{bucket}: disk full")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for FaultyStorage {
    async fn open(&self, bucket: &str) -> Result<(), Error> {
        CacheStorage::open(&self.db, bucket).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        CacheStorage::keys(&self.db).await
    }

    async fn delete(&self, bucket: &str) -> Result<bool, Error> {
        if self.failing_deletes.lock().unwrap().contains(bucket) {
            return Err(Error::CorruptEntry(format!("{bucket}: locked")));
        }
        CacheStorage::delete(&self.db, bucket).await
    }

    async fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.check_put(bucket)?;
        CacheStorage::put(&self.db, bucket, request, response).await
    }

    async fn put_all(&self, bucket: &str, pairs: &[(Request, Response)]) -> Result<(), Error> {
        self.check_put(bucket)?;
        CacheStorage::put_all(&self.db, bucket, pairs).await
    }

    async fn match_request(&self, bucket: &str, request: &Request) -> Result<Option<Response>, Error> {
        if self.failing_matches.lock().unwrap().contains(request.url.as_str()) {
            return Err(Error::CorruptEntry(format!("{}: unreadable", request.url)));
        }
        CacheStorage::match_request(&self.db, bucket, request).await
    }
}

pub fn url(path: &str) -> Url {
    Url::parse(&format!("{ORIGIN}{path}")).unwrap()
}

fn build<S: CacheStorage + 'static>(storage: Arc<S>) -> (ShellWorker<S, ScriptedNetwork>, Arc<ScriptedNetwork>) {
    let network = Arc::new(ScriptedNetwork::default());
    let origin = Url::parse(ORIGIN).unwrap();
    let worker = ShellWorker::new(storage, Arc::clone(&network), origin, Manifest::default());
    (worker, network)
}

pub async fn worker() -> (ShellWorker<CacheDb, ScriptedNetwork>, Arc<CacheDb>, Arc<ScriptedNetwork>) {
    let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
    let (worker, network) = build(Arc::clone(&db));
    (worker, db, network)
}

pub type FaultyWorker = ShellWorker<FaultyStorage, ScriptedNetwork>;

pub async fn faulty_worker() -> (FaultyWorker, Arc<FaultyStorage>, Arc<ScriptedNetwork>) {
    let storage = Arc::new(FaultyStorage::new().await);
    let (worker, network) = build(Arc::clone(&storage));
    (worker, storage, network)
}
