//! Redis distributed backend
//!
//! Production backend for the distributed tier. Uses a
//! [`ConnectionManager`] so a dropped connection is re-established
//! transparently; commands issued while Redis is down fail fast and the
//! client reports them as misses.
//!
//! ## Example
//!
//! ```ignore
//! use mlc_providers::distributed::RedisBackend;
//! use std::time::Duration;
//!
//! let backend = RedisBackend::connect("redis://localhost:6379", Duration::from_secs(2)).await?;
//! ```

use async_trait::async_trait;
use mlc_domain::error::{Error, Result};
use mlc_domain::ports::{DistributedBackend, KeyTtl};
use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use std::time::Duration;

/// Keys requested per SCAN round trip
const SCAN_COUNT: usize = 500;

/// Redis-backed [`DistributedBackend`]
#[derive(Clone)]
pub struct RedisBackend {
    manager: ConnectionManager,
    address: String,
}

fn command_error(command: &str, e: RedisError) -> Error {
    Error::connection_with_source(format!("Redis {command} failed: {e}"), e)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Strip credentials from a connection URL before it reaches logs
fn redact(url: &str) -> String {
    match (url.split_once("://"), url.rfind('@')) {
        (Some((scheme, _)), Some(at)) => format!("{scheme}://{}", &url[at + 1..]),
        _ => url.to_string(),
    }
}

impl RedisBackend {
    /// Connect and verify the server answers `PING` within `timeout`
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let address = redact(url);
        let client = Client::open(url).map_err(|e| {
            Error::connection_with_source(format!("Failed to create Redis client: {e}"), e)
        })?;

        let manager = match tokio::time::timeout(timeout, ConnectionManager::new(client)).await {
            Ok(Ok(manager)) => manager,
            Ok(Err(e)) => return Err(command_error("connect", e)),
            Err(_) => {
                return Err(Error::connection(format!(
                    "Redis connection to {address} timed out"
                )));
            }
        };

        let backend = Self { manager, address };
        match tokio::time::timeout(timeout, backend.ping()).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::connection("Redis PING timed out")),
        }
        tracing::info!(address = %backend.address, "Redis connection established");
        Ok(backend)
    }

    /// Server address, without credentials
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl DistributedBackend for RedisBackend {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| command_error("PING", e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| command_error("GET", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(millis(ttl));
        }
        cmd.query_async::<()>(&mut conn)
            .await
            .map_err(|e| command_error("SET", e))
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(keys)
            .query_async::<u64>(&mut conn)
            .await
            .map_err(|e| command_error("DEL", e))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let count = redis::cmd("EXISTS")
            .arg(key)
            .query_async::<u64>(&mut conn)
            .await
            .map_err(|e| command_error("EXISTS", e))?;
        Ok(count > 0)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.clone();
        redis::cmd("MGET")
            .arg(keys)
            .query_async::<Vec<Option<String>>>(&mut conn)
            .await
            .map_err(|e| command_error("MGET", e))
    }

    async fn mset(&self, entries: &[(String, String)], ttl: Option<Duration>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.cmd("SET").arg(key).arg(value);
            if let Some(ttl) = ttl {
                pipe.arg("PX").arg(millis(ttl));
            }
            pipe.ignore();
        }
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| command_error("MSET", e))
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async::<(u64, Vec<String>)>(&mut conn)
                .await
                .map_err(|e| command_error("SCAN", e))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn supports_scan(&self) -> bool {
        true
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut conn = self.manager.clone();
        let code = redis::cmd("PTTL")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| command_error("PTTL", e))?;
        Ok(KeyTtl::from_millis_code(code))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.manager.clone();
        redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis(ttl))
            .query_async::<bool>(&mut conn)
            .await
            .map_err(|e| command_error("PEXPIRE", e))
    }

    fn backend_name(&self) -> &str {
        "redis"
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
