//! SQLite-backed cache buckets.
//!
//! This module provides persistent, named buckets of request → response
//! entries using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Request identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Bucket-level cutover (deleting a bucket drops all of its entries)

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedResponse;
