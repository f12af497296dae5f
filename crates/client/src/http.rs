//! Request and response values exchanged between the host, the worker, the
//! network and the cache.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, header};
use shellcache_core::{CachedResponse, Error, cache::hash::compute_request_key};
use url::Url;

/// An intercepted request. Its identity is method + URL.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// URL that identifies this request in the cache: the fragment is never
    /// sent, so it is not part of the identity.
    pub fn cache_url(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }

    /// Cache key for this request's identity.
    pub fn key(&self) -> String {
        compute_request_key(self.method.as_str(), self.cache_url().as_str())
    }
}

/// A response snapshot. Cloning is cheap; the body is reference counted.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// URL the response was served from (after redirects, for network responses).
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Snapshot this response for storage under `request`'s identity.
    ///
    /// The final response URL is kept next to the request URL. Header values
    /// that are not visible ASCII are dropped.
    pub fn to_cached(&self, bucket: &str, request: &Request) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();

        CachedResponse::new(
            bucket,
            request.method.as_str(),
            request.cache_url().as_str(),
            self.status.as_u16(),
            headers,
            self.body.to_vec(),
        )
        .with_response_url(self.url.as_str())
    }

    /// Rebuild a response from a stored entry.
    pub fn from_cached(entry: CachedResponse) -> Result<Self, Error> {
        let url = Url::parse(&entry.response_url)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.response_url)))?;
        let status = StatusCode::from_u16(entry.status_code)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.url)))?;

        let mut headers = HeaderMap::with_capacity(entry.headers.len());
        for (name, value) in &entry.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("{}: header {name}: {e}", entry.url)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::CorruptEntry(format!("{}: header {name}: {e}", entry.url)))?;
            headers.append(name, value);
        }

        Ok(Self { url, status, headers, body: Bytes::from(entry.body) })
    }
}
