//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Cache bucket storage with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - The compiled-in worker manifest

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;

pub use cache::{CacheDb, CachedResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::Manifest;
