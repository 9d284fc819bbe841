//! Backend used when the distributed tier is disabled or unreachable
//!
//! Every call fails with a connection error, which the client turns into a
//! miss.

use async_trait::async_trait;
use mlc_domain::error::{Error, Result};
use mlc_domain::ports::{DistributedBackend, KeyTtl};
use std::time::Duration;

/// [`DistributedBackend`] with nothing behind it
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineBackend;

fn offline<T>() -> Result<T> {
    Err(Error::connection("distributed tier is offline"))
}

#[async_trait]
impl DistributedBackend for OfflineBackend {
    async fn ping(&self) -> Result<()> {
        offline()
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        offline()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<()> {
        offline()
    }

    async fn del(&self, _keys: &[String]) -> Result<u64> {
        offline()
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        offline()
    }

    async fn mget(&self, _keys: &[String]) -> Result<Vec<Option<String>>> {
        offline()
    }

    async fn mset(&self, _entries: &[(String, String)], _ttl: Option<Duration>) -> Result<()> {
        offline()
    }

    async fn scan(&self, _pattern: &str) -> Result<Vec<String>> {
        offline()
    }

    fn supports_scan(&self) -> bool {
        false
    }

    async fn ttl(&self, _key: &str) -> Result<KeyTtl> {
        offline()
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool> {
        offline()
    }

    fn backend_name(&self) -> &str {
        "offline"
    }
}
