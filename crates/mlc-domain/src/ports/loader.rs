//! Loader and validator callbacks
//!
//! Loaders are the external data providers (chain scans, price lookups) the
//! orchestrator calls on a miss. They receive the key being loaded.

use crate::error::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Produces the value for a key on a miss
pub type Loader<T> = Arc<dyn Fn(String) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Accepts or rejects a cached or loaded value
pub type Validator<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Wrap an async closure as a [`Loader`]
///
/// ```
/// use mlc_domain::ports::loader_fn;
///
/// let loader = loader_fn(|key: String| async move { Ok(format!("value-for-{key}")) });
/// # let _ = loader;
/// ```
pub fn loader_fn<T, F, Fut>(f: F) -> Loader<T>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move |key| Box::pin(f(key)))
}

/// Wrap a predicate as a [`Validator`]
pub fn validator_fn<T, F>(f: F) -> Validator<T>
where
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}
