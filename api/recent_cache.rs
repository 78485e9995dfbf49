use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use moka::Expiry;
use thiserror::Error;
use tracing::debug;

// Cached values must be `Clone`, so the source error is flattened to text.
#[derive(Error, Debug, Clone)]
#[error("failed to fetch recent movies: {0}")]
pub struct FetchError(pub String);

/// A TTL-based read-through cache holding a single value, the list of the
/// most recently added movies.
///
/// Concurrent readers of a missing value wait on a single fetch. A failed
/// fetch is handed to the waiting readers but expires right away so the next
/// read tries again. Writers call [`RecentCache::invalidate`] after changing
/// the catalog.
///
/// Entries are keyed by a generation that `invalidate` bumps. A fetch that
/// started before an invalidation lands under the old generation, which no
/// reader asks for anymore.
pub struct RecentCache<V> {
    cache: Cache<u64, Result<V, FetchError>>,
    generation: AtomicU64,
}

impl<V> RecentCache<V>
where
    V: Send + Clone + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .expire_after(ExpirationPolicy { ttl })
                .build(),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn get_or_fetch<Fut, E>(&self, fetch: Fut) -> Result<V, FetchError>
    where
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        let generation = self.generation.load(Ordering::Acquire);
        self.cache
            .get_with(generation, async move {
                debug!(generation, "Recent movies cache miss");
                fetch.await.map_err(|e| FetchError(e.to_string()))
            })
            .await
    }

    pub async fn invalidate(&self) {
        let stale = self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate(&stale).await;
    }
}

struct ExpirationPolicy {
    ttl: Duration,
}

impl<V> Expiry<u64, Result<V, FetchError>> for ExpirationPolicy {
    fn expire_after_create(
        &self,
        _key: &u64,
        value: &Result<V, FetchError>,
        _current_time: std::time::Instant,
    ) -> Option<Duration> {
        if value.is_ok() {
            Some(self.ttl)
        } else {
            Some(Duration::default())
        }
    }
}
