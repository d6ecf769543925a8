//! The cached read-query pipeline.
//!
//! Every read in the system flows through [`QueryExecutor::execute`] (or
//! [`QueryExecutor::execute_one`] for point lookups). A query is described by
//! an immutable [`QueryDescriptor`] that declares its result type and its
//! [`CachePolicy`]; the service layer supplies the fetch closure (storage
//! access, per-query filtering and ordering, projection to DTOs). Cacheable
//! descriptors are looked up first and their materialized result stored under
//! the declared key with its tags on a miss.
//!
//! Concurrent misses for the same key are not deduplicated; each fetches and
//! repopulates the cache. Entries are idempotent for unchanged data, so the
//! race only costs a redundant fetch. Storage errors propagate unchanged and
//! are never cached.

use std::future::Future;
use std::sync::Arc;

use tracing::trace;

use crate::application::repos::RepoError;
use crate::cache::{CacheKey, EntityTag, QueryCache};

/// Whether, and under which key, a query's result participates in caching.
#[derive(Debug, Clone)]
pub enum CachePolicy {
    /// Always fetch from storage.
    Bypass,
    /// Serve from cache under `key`; tag the entry for group invalidation.
    Cache {
        key: CacheKey,
        tags: Vec<EntityTag>,
    },
}

impl CachePolicy {
    pub fn cached(key: CacheKey, tags: &[EntityTag]) -> Self {
        Self::Cache {
            key,
            tags: tags.to_vec(),
        }
    }
}

/// An immutable read-query description: result type plus cache capability.
///
/// Descriptors carry the query parameters; the cache key must be a pure
/// function of those parameters so identical requests share an entry.
pub trait QueryDescriptor {
    type Output: Clone + Send + Sync + 'static;

    fn cache(&self) -> CachePolicy;
}

/// Executes read queries against a fetch closure with read-through caching.
#[derive(Clone)]
pub struct QueryExecutor {
    cache: Arc<QueryCache>,
}

impl QueryExecutor {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Run a collection query.
    ///
    /// On a cache hit the stored sequence is returned unchanged; on a miss
    /// the fetch runs to completion and its result is stored before being
    /// returned. Cancellation is cooperative: dropping the returned future
    /// aborts the underlying fetch.
    pub async fn execute<Q, F, Fut>(
        &self,
        descriptor: &Q,
        fetch: F,
    ) -> Result<Arc<Q::Output>, RepoError>
    where
        Q: QueryDescriptor,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Q::Output, RepoError>>,
    {
        match descriptor.cache() {
            CachePolicy::Cache { key, tags } => {
                if let Some(hit) = self.cache.get::<Q::Output>(&key) {
                    trace!(?key, "query cache hit");
                    return Ok(hit);
                }
                let value = Arc::new(fetch().await?);
                self.cache.insert(key, &tags, value.clone());
                Ok(value)
            }
            CachePolicy::Bypass => Ok(Arc::new(fetch().await?)),
        }
    }

    /// Run a point lookup.
    ///
    /// Not-found is surfaced as `None` and never cached, so a later insert
    /// under the same identifier is visible immediately.
    pub async fn execute_one<Q, F, Fut>(
        &self,
        descriptor: &Q,
        fetch: F,
    ) -> Result<Option<Arc<Q::Output>>, RepoError>
    where
        Q: QueryDescriptor,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Q::Output>, RepoError>>,
    {
        match descriptor.cache() {
            CachePolicy::Cache { key, tags } => {
                if let Some(hit) = self.cache.get::<Q::Output>(&key) {
                    trace!(?key, "query cache hit");
                    return Ok(Some(hit));
                }
                match fetch().await? {
                    Some(found) => {
                        let value = Arc::new(found);
                        self.cache.insert(key, &tags, value.clone());
                        Ok(Some(value))
                    }
                    None => Ok(None),
                }
            }
            CachePolicy::Bypass => Ok(fetch().await?.map(Arc::new)),
        }
    }
}
