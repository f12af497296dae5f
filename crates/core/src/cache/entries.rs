//! Entry CRUD operations.
//!
//! Entries are response snapshots keyed by request identity inside a bucket.
//! Writes are UPSERTs, so concurrent stores to the same key resolve as last
//! write wins.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CachedResponse {
    pub bucket: String,
    pub key_hash: String,
    pub method: String,
    /// Request URL the entry is keyed by.
    pub url: String,
    /// URL the response was served from; differs from `url` after a redirect.
    pub response_url: String,
    pub status_code: u16,
    /// Header name/value pairs in response order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

/// Listing row for an entry, without the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub stored_at: String,
}

impl CachedResponse {
    /// Build a snapshot for `bucket`, deriving the key from method and URL.
    pub fn new(
        bucket: &str, method: &str, url: &str, status_code: u16, headers: Vec<(String, String)>, body: Vec<u8>,
    ) -> Self {
        Self {
            bucket: bucket.to_string(),
            key_hash: compute_request_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            response_url: url.to_string(),
            status_code,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Record the final URL of a redirected response.
    pub fn with_response_url(mut self, response_url: &str) -> Self {
        self.response_url = response_url.to_string();
        self
    }
}

fn insert_entry(conn: &rusqlite::Connection, entry: &CachedResponse) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(&entry.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;

    conn.execute(
        "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
        params![&entry.bucket, &entry.stored_at],
    )?;
    conn.execute(
        "INSERT INTO entries (bucket, key_hash, method, url, response_url, status_code, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(bucket, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            response_url = excluded.response_url,
            status_code = excluded.status_code,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            &entry.bucket,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            &entry.response_url,
            entry.status_code,
            headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Insert or replace a single entry.
    ///
    /// The entry's bucket is created if it does not exist yet.
    pub async fn put_entry(&self, entry: &CachedResponse) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_entry(&tx, &entry)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a batch of entries in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, entries: Vec<CachedResponse>) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for entry in &entries {
                    insert_entry(&tx, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by bucket and request key.
    ///
    /// Returns None if the bucket or the key doesn't exist.
    pub async fn match_entry(&self, bucket: &str, key_hash: &str) -> Result<Option<CachedResponse>, Error> {
        let bucket = bucket.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT bucket, key_hash, method, url, response_url, status_code, headers_json, body, stored_at
                    FROM entries WHERE bucket = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![bucket, key_hash], |row| {
                    Ok((
                        CachedResponse {
                            bucket: row.get(0)?,
                            key_hash: row.get(1)?,
                            method: row.get(2)?,
                            url: row.get(3)?,
                            response_url: row.get(4)?,
                            status_code: row.get(5)?,
                            headers: Vec::new(),
                            body: row.get(7)?,
                            stored_at: row.get(8)?,
                        },
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((mut entry, headers_json)) => {
                        entry.headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.url)))?;
                        Ok(Some(entry))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of a bucket ordered by URL.
    pub async fn list_entries(&self, bucket: &str) -> Result<Vec<EntrySummary>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status_code, stored_at FROM entries
                    WHERE bucket = ?1 ORDER BY url, method",
                )?;
                let rows = stmt
                    .query_map(params![bucket], |row| {
                        Ok(EntrySummary {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status_code: row.get(2)?,
                            stored_at: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}
