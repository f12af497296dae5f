//! Client code for shellcache.
//!
//! This crate provides the network-fetch capability, the cache capability
//! over [`shellcache_core::CacheDb`], and the Shell Cache Worker together
//! with the host that delivers its lifecycle and fetch events.

pub mod fetch;
pub mod http;
pub mod storage;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use http::{Request, Response};
pub use reqwest::{Method, StatusCode, header};
pub use storage::CacheStorage;
pub use worker::{FetchOutcome, ResponseSource, Served, ShellWorker, WorkerHost, WorkerState};
