//! Generation and entry operations.
//!
//! A generation is created once, filled with insert-or-overwrite writes, and
//! removed only as a whole. Entries are never patched in place.

use super::connection::CacheDb;
use super::key::RequestKey;
use crate::Error;
use crate::http::{Headers, Response, ResponseType};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Summary of one generation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub tag: String,
    pub created_at: String,
    pub entries: u64,
}

/// A response as persisted in a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub vary: String,
    pub response: Response,
    pub stored_at: String,
}

impl StoredResponse {
    pub fn is_opaque(&self) -> bool {
        self.response.is_opaque()
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

impl CacheDb {
    /// Create a generation if it doesn't exist yet.
    ///
    /// Opening an existing tag is a no-op; its entries are kept.
    pub async fn open_generation(&self, tag: &str) -> Result<(), Error> {
        let tag = tag.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO generations (tag, created_at) VALUES (?1, ?2)
                     ON CONFLICT(tag) DO NOTHING",
                    params![tag, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a generation exists.
    pub async fn has_generation(&self, tag: &str) -> Result<bool, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE tag = ?1)",
                    params![tag],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every generation with its entry count, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Generation>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.tag, g.created_at, COUNT(e.key_hash)
                     FROM generations g LEFT JOIN entries e ON e.generation = g.tag
                     GROUP BY g.tag
                     ORDER BY g.created_at ASC, g.tag ASC",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(Generation { tag: row.get(0)?, created_at: row.get(1)?, entries: row.get::<_, i64>(2)? as u64 })
                })?;
                let mut generations = Vec::new();
                for row in rows {
                    generations.push(row?);
                }
                Ok(generations)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries.
    ///
    /// Returns false if the generation didn't exist.
    pub async fn delete_generation(&self, tag: &str) -> Result<bool, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE tag = ?1", params![tag])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite one entry in a generation.
    ///
    /// The write is pinned to `tag`: if that generation no longer exists the
    /// write is rejected with [`Error::GenerationMissing`] rather than
    /// recreating it. Existence check and write run in one call on the
    /// connection thread, so a concurrent delete cannot slip between them.
    pub async fn put_entry(&self, tag: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let tag = tag.to_string();
        let key = key.clone();
        let hash = key.hash();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE tag = ?1)",
                    params![&tag],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::GenerationMissing(tag));
                }

                conn.execute(
                    "INSERT INTO entries (
                        generation, key_hash, method, url, vary, status, status_text,
                        headers_json, body, response_type, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        vary = excluded.vary,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        response_type = excluded.response_type,
                        stored_at = excluded.stored_at",
                    params![
                        &tag,
                        &hash,
                        &key.method,
                        &key.url,
                        &key.vary,
                        response.status as i64,
                        &response.status_text,
                        &headers_json,
                        response.body.as_ref(),
                        response.response_type.as_str(),
                        &now,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry. Read-only.
    ///
    /// Returns None if the generation or the key doesn't exist.
    pub async fn match_entry(&self, tag: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let tag = tag.to_string();
        let hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, vary, status, status_text,
                            headers_json, body, response_type, stored_at
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![tag, hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Vec<u8>>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, String>(9)?,
                    ))
                });

                let (key_hash, method, url, vary, status, status_text, headers_json, body, response_type, stored_at) =
                    match result {
                        Ok(row) => row,
                        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                        Err(e) => return Err(e.into()),
                    };

                let headers: Headers = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::CorruptEntry(format!("{url}: headers: {e}")))?;
                let response_type = ResponseType::parse(&response_type)
                    .ok_or_else(|| Error::CorruptEntry(format!("{url}: response type {response_type}")))?;
                let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("{url}: status {status}")))?;

                Ok(Some(StoredResponse {
                    key_hash,
                    method,
                    url,
                    vary,
                    response: Response { status, status_text, headers, body: Bytes::from(body), response_type },
                    stored_at,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a generation, sorted.
    pub async fn entry_urls(&self, tag: &str) -> Result<Vec<String>, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY url ASC")?;
                let rows = stmt.query_map(params![tag], |row| row.get::<_, String>(0))?;
                let mut urls = Vec::new();
                for row in rows {
                    urls.push(row?);
                }
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn key(url: &str) -> RequestKey {
        RequestKey::for_url(&Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("chakki-cache-v1").await.unwrap();

        let response = Response::new(200, "console.log(1)").with_header("Content-Type", "text/javascript");
        db.put_entry("chakki-cache-v1", &key("https://app.example/app.js"), &response)
            .await
            .unwrap();

        let stored = db
            .match_entry("chakki-cache-v1", &key("https://app.example/app.js"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.response, response);
        assert_eq!(stored.url, "https://app.example/app.js");
        assert!(!stored.is_opaque());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("chakki-cache-v1").await.unwrap();
        let result = db.match_entry("chakki-cache-v1", &key("https://app.example/nope.js")).await.unwrap();
        assert!(result.is_none());

        let result = db.match_entry("chakki-cache-v0", &key("https://app.example/nope.js")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        let k = key("https://app.example/app.js");

        db.put_entry("v1", &k, &Response::new(200, "old")).await.unwrap();
        db.put_entry("v1", &k, &Response::new(200, "new")).await.unwrap();

        let stored = db.match_entry("v1", &k).await.unwrap().unwrap();
        assert_eq!(stored.response.body, Bytes::from_static(b"new"));
        assert_eq!(db.entry_urls("v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_opaque_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        let k = key("https://cdn.example/lib.js");

        db.put_entry("v1", &k, &Response::new(200, "lib").into_opaque()).await.unwrap();

        let stored = db.match_entry("v1", &k).await.unwrap().unwrap();
        assert!(stored.is_opaque());
        assert_eq!(stored.response.status, 0);
    }

    #[tokio::test]
    async fn test_put_into_missing_generation_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.put_entry("gone", &key("https://app.example/app.js"), &Response::new(200, "x")).await;
        assert!(matches!(result, Err(Error::GenerationMissing(tag)) if tag == "gone"));
        assert!(!db.has_generation("gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_generation_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        db.open_generation("v2").await.unwrap();
        db.put_entry("v1", &key("https://app.example/a.js"), &Response::new(200, "a")).await.unwrap();
        db.put_entry("v2", &key("https://app.example/a.js"), &Response::new(200, "a2")).await.unwrap();

        assert!(db.delete_generation("v1").await.unwrap());
        assert!(!db.delete_generation("v1").await.unwrap());

        assert!(db.entry_urls("v1").await.unwrap().is_empty());
        assert_eq!(db.entry_urls("v2").await.unwrap(), vec!["https://app.example/a.js".to_string()]);

        let tags: Vec<String> = db.list_generations().await.unwrap().into_iter().map(|g| g.tag).collect();
        assert_eq!(tags, vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_open_generation_keeps_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        db.put_entry("v1", &key("https://app.example/a.js"), &Response::new(200, "a")).await.unwrap();
        db.open_generation("v1").await.unwrap();

        let generations = db.list_generations().await.unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].entries, 1);
    }
}
