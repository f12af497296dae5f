//! Named bucket operations.
//!
//! A bucket is the unit of versioned cutover: entries live inside exactly
//! one bucket and go away with it.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Open a bucket, creating it if absent.
    ///
    /// Returns true if the bucket was created by this call.
    pub async fn open_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a bucket exists.
    pub async fn has_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List bucket names in creation order.
    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and every entry in it.
    ///
    /// Returns false if no bucket had that name.
    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedResponse;

    #[tokio::test]
    async fn test_open_bucket_creates_once() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.open_bucket("shell-cache-v1").await.unwrap());
        assert!(!db.open_bucket("shell-cache-v1").await.unwrap());
        assert_eq!(db.bucket_names().await.unwrap(), vec!["shell-cache-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_has_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.has_bucket("shell-cache-v1").await.unwrap());
        db.open_bucket("shell-cache-v1").await.unwrap();
        assert!(db.has_bucket("shell-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.delete_bucket("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_bucket_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = CachedResponse::new("shell-cache-v0", "GET", "https://example.com/", 200, vec![], b"old".to_vec());
        db.put_entry(&entry).await.unwrap();

        assert!(db.delete_bucket("shell-cache-v0").await.unwrap());
        db.open_bucket("shell-cache-v0").await.unwrap();
        assert!(db.match_entry("shell-cache-v0", &entry.key_hash).await.unwrap().is_none());
    }
}
