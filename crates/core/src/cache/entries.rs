//! Store and entry operations on the SQLite backend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::CacheStorage;
use super::connection::CacheDb;
use crate::Error;
use crate::message::{Headers, Request, Response};

/// A stored request/response pair with its bookkeeping columns.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredEntry {
    pub store: String,
    pub cache_key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(skip)]
    pub body: Vec<u8>,
    pub body_len: usize,
    pub stored_at: String,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn ensure_store(conn: &rusqlite::Connection, store: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO stores (name, seq, created_at)
         VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM stores), ?2)",
        params![store, timestamp(Utc::now())],
    )?;
    Ok(())
}

fn upsert_entry(
    conn: &rusqlite::Connection, store: &str, request: &Request, response: &Response, stored_at: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "INSERT INTO entries (store, cache_key, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(store, cache_key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            store,
            request.cache_key(),
            &request.method,
            request.url.as_str(),
            response.status as i64,
            headers_json,
            response.body.to_vec(),
            stored_at,
        ],
    )?;
    Ok(())
}

fn decode_response(status: i64, headers_json: &str, body: Vec<u8>) -> Result<Response, Error> {
    let headers: Headers = serde_json::from_str(headers_json)?;
    let status = u16::try_from(status).map_err(|_| Error::Serialization(format!("invalid status {status}")))?;
    Ok(Response { status, headers, body: Bytes::from(body) })
}

type RawRow = (i64, String, Vec<u8>);

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

impl CacheDb {
    /// Get the full entry for `cache_key` in `store`.
    pub async fn get_entry(&self, store: &str, cache_key: &str) -> Result<Option<StoredEntry>, Error> {
        if !super::hash::is_valid_key(cache_key) {
            return Err(Error::InvalidHash);
        }
        let store = store.to_string();
        let cache_key = cache_key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let result = conn.query_row(
                    "SELECT store, cache_key, method, url, status, headers_json, body, stored_at
                     FROM entries WHERE store = ?1 AND cache_key = ?2",
                    params![store, cache_key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, Vec<u8>>(6)?,
                            row.get::<_, String>(7)?,
                        ))
                    },
                );

                match result {
                    Ok((store, cache_key, method, url, status, headers_json, body, stored_at)) => {
                        let response = decode_response(status, &headers_json, body)?;
                        Ok(Some(StoredEntry {
                            store,
                            cache_key,
                            method,
                            url,
                            status: response.status,
                            headers: response.headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                            body_len: response.body.len(),
                            body: response.body.to_vec(),
                            stored_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in `store`.
    pub async fn count_entries(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Entries of `store` in key order, without bodies.
    pub async fn list_entries(&self, store: &str) -> Result<Vec<StoredEntry>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<StoredEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT store, cache_key, method, url, status, headers_json, length(body), stored_at
                     FROM entries WHERE store = ?1 ORDER BY url, cache_key",
                )?;
                let rows = stmt.query_map(params![store], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                })?;

                let mut entries = Vec::new();
                for row in rows {
                    let (store, cache_key, method, url, status, headers_json, body_len, stored_at) = row?;
                    let response = decode_response(status, &headers_json, Vec::new())?;
                    entries.push(StoredEntry {
                        store,
                        cache_key,
                        method,
                        url,
                        status: response.status,
                        headers: response.headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                        body: Vec::new(),
                        body_len: body_len as usize,
                        stored_at,
                    });
                }
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries of `store` stored before `cutoff`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_entries_older_than(&self, store: &str, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let store = store.to_string();
        let cutoff = timestamp(cutoff);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE store = ?1 AND stored_at < ?2", params![store, cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, store: &str) -> Result<(), Error> {
        let store = store.to_string();
        self.conn.call(move |conn| ensure_store(conn, &store)).await.map_err(Error::from)
    }

    async fn match_in(&self, store: &str, request: &Request) -> Result<Option<Response>, Error> {
        let store = store.to_string();
        let key = request.cache_key();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT status, headers_json, body FROM entries WHERE store = ?1 AND cache_key = ?2",
                    params![store, key],
                    read_raw,
                );

                match result {
                    Ok((status, headers_json, body)) => Ok(Some(decode_response(status, &headers_json, body)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = request.cache_key();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT e.status, e.headers_json, e.body
                     FROM entries e JOIN stores s ON s.name = e.store
                     WHERE e.cache_key = ?1
                     ORDER BY s.seq ASC LIMIT 1",
                    params![key],
                    read_raw,
                );

                match result {
                    Ok((status, headers_json, body)) => Ok(Some(decode_response(status, &headers_json, body)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, store: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let store = store.to_string();
        let request = request.clone();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_store(conn, &store)?;
                upsert_entry(conn, &store, &request, &response, &timestamp(Utc::now()))
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, store: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let store = store.to_string();
        let entries = entries.to_vec();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                ensure_store(&tx, &store)?;
                let stored_at = timestamp(Utc::now());
                for (request, response) in &entries {
                    upsert_entry(&tx, &store, request, response, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY seq ASC")?;
                let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
                names.collect::<Result<Vec<_>, _>>().map_err(Error::from)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_store(&self, store: &str) -> Result<bool, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![store])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
