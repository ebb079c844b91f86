//! Partition and entry operations on the SQLite store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::store::{CacheStore, EntryMeta};
use crate::http::{Request, Response};
use crate::Error;

impl CacheDb {
    /// Insert or replace the entry for a request.
    ///
    /// Creates the partition row first so a put into an unknown partition
    /// behaves like opening it.
    pub async fn put_entry(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = request.cache_key();
        let method = request.method.clone();
        let url = request.url.to_string();
        let status = response.status;
        let status_text = response.status_text.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![&partition, &now],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        partition_name, key, method, url, status, status_text, headers_json, body, cached_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(partition_name, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        cached_at = excluded.cached_at",
                    params![&partition, &key, &method, &url, status, &status_text, &headers_json, &body, &now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the stored response for a request.
    ///
    /// Returns None if the partition or entry doesn't exist.
    pub async fn match_entry(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        let partition = partition.to_string();
        let key = request.cache_key();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                    FROM entries WHERE partition_name = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![partition, key], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((status, status_text, headers_json, body)) => {
                        let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
                        Ok(Some(Response { status, status_text, headers, body }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a single entry by key.
    pub async fn delete_entry(&self, partition: &str, key: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE partition_name = ?1 AND key = ?2",
                    params![partition, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List entry metadata for a partition, oldest write first.
    pub async fn list_entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, method, url, status, headers_json, cached_at
                    FROM entries WHERE partition_name = ?1
                    ORDER BY cached_at ASC, key ASC",
                )?;

                let rows = stmt
                    .query_map(params![partition], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, u16>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut entries = Vec::with_capacity(rows.len());
                for (key, method, url, status, headers_json, cached_at) in rows {
                    let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
                    let date = headers.get("date").cloned();
                    entries.push(EntryMeta { key, method, url, status, date, cached_at });
                }
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    /// Create a partition row if missing.
    pub async fn ensure_partition(&self, partition: &str) -> Result<(), Error> {
        let partition = partition.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all partitions.
    pub async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop a partition. Entries go with it through the cascading foreign key.
    pub async fn drop_partition(&self, partition: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![partition])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.ensure_partition(partition).await
    }

    async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_entry(partition, request, response).await
    }

    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.match_entry(partition, request).await
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error> {
        self.delete_entry(partition, key).await
    }

    async fn entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        self.list_entries(partition).await
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.list_partitions().await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        self.drop_partition(partition).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(path: &str) -> Request {
        Request::get(Url::parse("https://sp1sh.dev").unwrap().join(path).unwrap())
    }

    fn response(body: &str) -> Response {
        Response::new(200, "OK")
            .with_header("content-type", "text/plain")
            .with_header("date", "Sun, 06 Nov 1994 08:49:37 GMT")
            .with_body(body)
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("/api/scripts");
        db.put_entry("sp1sh-runtime-v1", &req, &response("[]")).await.unwrap();

        let found = db.match_entry("sp1sh-runtime-v1", &req).await.unwrap().unwrap();
        assert_eq!(found, response("[]"));
    }

    #[tokio::test]
    async fn test_match_is_partition_scoped() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("/api/scripts");
        db.put_entry("sp1sh-runtime-v1", &req, &response("[]")).await.unwrap();

        assert!(db.match_entry("sp1sh-cache-v1", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("/");
        db.put_entry("p", &req, &response("old")).await.unwrap();
        db.put_entry("p", &req, &response("new")).await.unwrap();

        let found = db.match_entry("p", &req).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(db.list_entries("p").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_entries_reads_date() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("p", &request("/a"), &response("a")).await.unwrap();
        db.put_entry("p", &request("/b"), &Response::new(200, "OK")).await.unwrap();

        let entries = db.list_entries("p").await.unwrap();
        assert_eq!(entries.len(), 2);
        let dated = entries.iter().find(|e| e.url.ends_with("/a")).unwrap();
        assert_eq!(dated.date.as_deref(), Some("Sun, 06 Nov 1994 08:49:37 GMT"));
        assert!(dated.date().is_some());
        let undated = entries.iter().find(|e| e.url.ends_with("/b")).unwrap();
        assert!(undated.date.is_none());
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("/a");
        db.put_entry("p", &req, &response("a")).await.unwrap();

        assert!(db.delete_entry("p", &req.cache_key()).await.unwrap());
        assert!(!db.delete_entry("p", &req.cache_key()).await.unwrap());
        assert!(db.match_entry("p", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drop_partition_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("/a");
        db.put_entry("old", &req, &response("a")).await.unwrap();
        db.ensure_partition("kept").await.unwrap();

        assert!(db.drop_partition("old").await.unwrap());
        assert_eq!(db.list_partitions().await.unwrap(), vec!["kept".to_string()]);

        let orphans: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_store_trait_roundtrip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store: &dyn CacheStore = &db;
        store.open("sp1sh-images-v1").await.unwrap();
        assert_eq!(store.partitions().await.unwrap(), vec!["sp1sh-images-v1".to_string()]);
        assert!(store.entries("sp1sh-images-v1").await.unwrap().is_empty());
        assert!(store.entries("missing").await.unwrap().is_empty());
    }
}
