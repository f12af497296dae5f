//! Cache capability used by the worker.
//!
//! The worker only needs named buckets with atomic per-key put/match and
//! bucket-level delete; no cross-request transactions.

use async_trait::async_trait;
use shellcache_core::{CacheDb, Error};

use crate::http::{Request, Response};

/// Persistent store of named buckets of request → response entries.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a bucket, creating it if absent.
    async fn open(&self, bucket: &str) -> Result<(), Error>;

    /// Names of every existing bucket.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a bucket and its entries. Returns false if it did not exist.
    async fn delete(&self, bucket: &str) -> Result<bool, Error>;

    /// Store one response under the request's identity (last write wins).
    async fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Store every pair or none.
    async fn put_all(&self, bucket: &str, pairs: &[(Request, Response)]) -> Result<(), Error>;

    /// Exact request identity lookup.
    async fn match_request(&self, bucket: &str, request: &Request) -> Result<Option<Response>, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, bucket: &str) -> Result<(), Error> {
        if self.open_bucket(bucket).await? {
            tracing::debug!(bucket, "created cache bucket");
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.bucket_names().await
    }

    async fn delete(&self, bucket: &str) -> Result<bool, Error> {
        self.delete_bucket(bucket).await
    }

    async fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_entry(&response.to_cached(bucket, request)).await
    }

    async fn put_all(&self, bucket: &str, pairs: &[(Request, Response)]) -> Result<(), Error> {
        let entries = pairs
            .iter()
            .map(|(request, response)| response.to_cached(bucket, request))
            .collect();
        self.put_entries(entries).await
    }

    async fn match_request(&self, bucket: &str, request: &Request) -> Result<Option<Response>, Error> {
        match self.match_entry(bucket, &request.key()).await? {
            Some(entry) => Response::from_cached(entry).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use url::Url;

    fn pair(url: &str, body: &'static str) -> (Request, Response) {
        let url = Url::parse(url).unwrap();
        let response = Response {
            url: url.clone(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        };
        (Request::get(url), response)
    }

    #[tokio::test]
    async fn test_put_then_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let (request, response) = pair("http://localhost:8000/portal/", "portal");

        db.put("shell-cache-v1", &request, &response).await.unwrap();

        let found = db.match_request("shell-cache-v1", &request).await.unwrap();
        assert_eq!(found, Some(response));
    }

    #[tokio::test]
    async fn test_match_other_method_misses() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let (request, response) = pair("http://localhost:8000/portal/", "portal");
        db.put("shell-cache-v1", &request, &response).await.unwrap();

        let head = Request::new(reqwest::Method::HEAD, request.url.clone());
        assert!(db.match_request("shell-cache-v1", &head).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_and_delete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        CacheStorage::open(&db, "shell-cache-v0").await.unwrap();
        CacheStorage::open(&db, "shell-cache-v1").await.unwrap();

        assert!(CacheStorage::delete(&db, "shell-cache-v0").await.unwrap());
        assert_eq!(db.keys().await.unwrap(), vec!["shell-cache-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_all() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let pairs = vec![pair("http://localhost:8000/", "home"), pair("http://localhost:8000/offline/", "offline")];

        db.put_all("shell-cache-v1", &pairs).await.unwrap();

        for (request, response) in &pairs {
            assert_eq!(db.match_request("shell-cache-v1", request).await.unwrap().as_ref(), Some(response));
        }
    }
}
