//! Test doubles shared by the tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use shellcache_client::header::HeaderMap;
use shellcache_client::{Network, Request, Response, ShellWorker, StatusCode, WorkerHost};
use shellcache_core::{CacheDb, Error, Manifest};
use url::Url;

pub const ORIGIN: &str = "http://localhost:8000";

/// Canned 200 responses by URL; everything else rejects.
#[derive(Default)]
pub struct StubNetwork {
    pages: Mutex<HashMap<String, &'static str>>,
    offline: Mutex<bool>,
}

impl StubNetwork {
    pub fn page(&self, path: &str, body: &'static str) {
        self.pages.lock().unwrap().insert(format!("{ORIGIN}{path}"), body);
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if *self.offline.lock().unwrap() {
            return Err(Error::Network("offline".into()));
        }
        let body = self
            .pages
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .copied()
            .ok_or_else(|| Error::Network(format!("no route to {}", request.url)))?;
        Ok(Response {
            url: request.url.clone(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        })
    }
}

/// A host whose network serves every shell asset.
pub async fn host() -> (WorkerHost<CacheDb, StubNetwork>, Arc<StubNetwork>) {
    let network = Arc::new(StubNetwork::default());
    let manifest = Manifest::default();
    for asset in &manifest.shell_assets {
        network.page(asset, "shell");
    }
    let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
    let worker = ShellWorker::new(db, Arc::clone(&network), Url::parse(ORIGIN).unwrap(), manifest);
    (WorkerHost::new(worker), network)
}

/// Decode the JSON text content of a tool result.
pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
