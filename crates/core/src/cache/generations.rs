//! Generation lifecycle and entry operations.
//!
//! A generation is one named, versioned key-value store of stored responses.
//! Generations are superseded rather than mutated: a new deployment writes a
//! new generation and activation deletes the old ones wholesale.

use super::connection::CacheStorage;
use super::entries::{RequestKey, StoredResponse};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Handle to a single named generation.
///
/// The handle is lazy: the generation row is created by `CacheStorage::open_generation`
/// or by the first `put`, whichever comes first.
#[derive(Clone, Debug)]
pub struct Generation {
    storage: CacheStorage,
    name: String,
}

impl CacheStorage {
    /// Open the named generation, creating it if absent.
    pub async fn open_generation(&self, name: &str) -> Result<Generation, Error> {
        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![owned, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(self.generation(name))
    }

    /// Handle to the named generation without touching the database.
    pub fn generation(&self, name: &str) -> Generation {
        Generation { storage: self.clone(), name: name.to_string() }
    }

    /// Check whether a generation with this name exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every generation, in creation order.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every entry in it.
    ///
    /// Returns false if no generation had this name.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

impl Generation {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response snapshot, overwriting any entry with the same identity.
    ///
    /// Recreates the generation row if it was deleted in the meantime.
    ///
    /// # Errors
    ///
    /// Returns `Error::Uncacheable` for anything but a 200 basic response.
    pub async fn put(&self, response: &StoredResponse) -> Result<(), Error> {
        if !response.is_storable() {
            return Err(Error::Uncacheable(format!(
                "{} {} ({} {})",
                response.method, response.url, response.status, response.response_type
            )));
        }

        let generation = self.name.clone();
        let key = response.request_key().cache_key();
        let headers_json = response.headers_json()?;
        let response = response.clone();

        self.storage
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![&generation, chrono::Utc::now().to_rfc3339()],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                    generation, entry_key, method, url, response_url, status, status_text,
                    response_type, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(generation, entry_key) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    response_url = excluded.response_url,
                    status = excluded.status,
                    status_text = excluded.status_text,
                    response_type = excluded.response_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &generation,
                        &key,
                        &response.method,
                        &response.url,
                        &response.response_url,
                        response.status,
                        &response.status_text,
                        response.response_type.as_str(),
                        &headers_json,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for a request identity.
    ///
    /// Returns None if this generation holds no entry for it.
    pub async fn match_request(&self, method: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        let generation = self.name.clone();
        let key = RequestKey::new(method, url).cache_key();
        self.storage
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, response_url, status, status_text, response_type, headers_json, body, stored_at
                FROM entries WHERE generation = ?1 AND entry_key = ?2",
                )?;

                let row = stmt.query_row(params![generation, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u16>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Vec<u8>>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                });

                let (method, url, response_url, status, status_text, response_type, headers_json, body, stored_at) =
                    match row {
                        Ok(r) => r,
                        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                        Err(e) => return Err(e.into()),
                    };

                let headers = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::InvalidInput(format!("stored headers: {e}")))?;

                Ok(Some(StoredResponse {
                    method,
                    url,
                    response_url,
                    status,
                    status_text,
                    response_type: response_type.parse()?,
                    headers,
                    body,
                    stored_at,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Request identities stored in this generation, oldest write first.
    pub async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        let generation = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE generation = ?1 ORDER BY rowid ASC")?;
                let keys = stmt
                    .query_map(params![generation], |row| {
                        Ok(RequestKey { method: row.get(0)?, url: row.get(1)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this generation.
    pub async fn len(&self) -> Result<u64, Error> {
        let generation = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entries::ResponseType;

    fn stored(url: &str, body: &str) -> StoredResponse {
        StoredResponse {
            method: "GET".into(),
            url: url.into(),
            response_url: url.into(),
            status: 200,
            status_text: "OK".into(),
            response_type: ResponseType::Basic,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: body.as_bytes().to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_open_generation_creates_once() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.open_generation("site-cache-v1").await.unwrap();
        storage.open_generation("site-cache-v1").await.unwrap();

        assert_eq!(storage.generation_names().await.unwrap(), vec!["site-cache-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let generation = storage.open_generation("site-cache-v1").await.unwrap();
        let response = stored("https://site.test/a.png", "png-bytes");

        generation.put(&response).await.unwrap();

        let found = generation
            .match_request("GET", "https://site.test/a.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, response);
    }

    #[tokio::test]
    async fn test_redirected_response_keeps_final_url() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let generation = storage.open_generation("site-cache-v1").await.unwrap();
        let mut response = stored("https://site.test/latest.png", "png-bytes");
        response.response_url = "https://site.test/v2/latest.png".into();

        generation.put(&response).await.unwrap();

        let found = generation
            .match_request("GET", "https://site.test/latest.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.url, "https://site.test/latest.png");
        assert_eq!(found.response_url, "https://site.test/v2/latest.png");
    }

    #[tokio::test]
    async fn test_match_missing() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let generation = storage.open_generation("site-cache-v1").await.unwrap();
        let found = generation.match_request("GET", "https://site.test/none").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_identity() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let generation = storage.open_generation("site-cache-v1").await.unwrap();

        generation.put(&stored("https://site.test/api/data", "old")).await.unwrap();
        generation.put(&stored("https://site.test/api/data", "new")).await.unwrap();

        let found = generation
            .match_request("GET", "https://site.test/api/data")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(generation.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_unstorable() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let generation = storage.open_generation("site-cache-v1").await.unwrap();
        let mut response = stored("https://site.test/missing.png", "");
        response.status = 404;

        let result = generation.put(&response).await;
        assert!(matches!(result, Err(Error::Uncacheable(_))));
        assert!(generation.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let v1 = storage.open_generation("site-cache-v1").await.unwrap();
        let v2 = storage.open_generation("site-cache-v2").await.unwrap();

        v1.put(&stored("https://site.test/", "v1 root")).await.unwrap();

        assert!(v2.match_request("GET", "https://site.test/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_generation_drops_entries() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let v1 = storage.open_generation("site-cache-v1").await.unwrap();
        v1.put(&stored("https://site.test/", "root")).await.unwrap();

        assert!(storage.delete_generation("site-cache-v1").await.unwrap());
        assert!(!storage.has_generation("site-cache-v1").await.unwrap());
        assert!(v1.is_empty().await.unwrap());
        assert!(!storage.delete_generation("site-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_recreates_generation() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let lazy = storage.generation("site-cache-v3");
        assert!(!storage.has_generation("site-cache-v3").await.unwrap());

        lazy.put(&stored("https://site.test/", "root")).await.unwrap();
        assert!(storage.has_generation("site-cache-v3").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_in_write_order() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let generation = storage.open_generation("site-cache-v1").await.unwrap();
        generation.put(&stored("https://site.test/", "root")).await.unwrap();
        generation.put(&stored("https://site.test/a.png", "a")).await.unwrap();

        let keys = generation.keys().await.unwrap();
        let urls: Vec<_> = keys.iter().map(|k| k.url.as_str()).collect();
        assert_eq!(urls, vec!["https://site.test/", "https://site.test/a.png"]);
    }
}
