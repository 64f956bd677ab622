//! Result Cache — memoizes breakdowns per `(version_hash, amount)`.
//!
//! Each key maps to a shared `OnceCell`. The first caller initializes it; concurrent callers
//! for the same key await that one computation. A failed computation leaves the cell empty,
//! so waiters retry, and the empty cell is dropped from the index. The LRU bound only drops
//! cells from the index; callers already holding a cell still receive its value.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::errors::AppError;
use crate::models::pack_set::CalculationResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub version_hash: String,
    pub amount: i64,
}

type Slot = Arc<OnceCell<CalculationResult>>;

pub struct ResultCache {
    entries: Mutex<LruCache<CacheKey, Slot>>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the cached result for `key`, or runs `compute` exactly once across all
    /// concurrent callers for that key.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<CalculationResult, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CalculationResult, AppError>>,
    {
        let slot = {
            let mut entries = self.entries.lock().await;
            entries
                .get_or_insert(key.clone(), || Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(hit) = slot.get() {
            debug!(hash = %key.version_hash, amount = key.amount, "result cache hit");
            return Ok(hit.clone());
        }

        let outcome = slot
            .get_or_try_init(|| {
                debug!(hash = %key.version_hash, amount = key.amount, "result cache miss");
                compute()
            })
            .await;

        match outcome {
            Ok(result) => Ok(result.clone()),
            Err(e) => {
                self.discard_empty(&key, &slot).await;
                Err(e)
            }
        }
    }

    /// Drops `slot` from the index if it is still the entry for `key` and never filled,
    /// so failed requests do not displace cached results.
    async fn discard_empty(&self, key: &CacheKey, slot: &Slot) {
        let mut entries = self.entries.lock().await;
        let stale = entries
            .peek(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            entries.pop(key);
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    #[cfg(test)]
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .await
            .peek(key)
            .is_some_and(|slot| slot.initialized())
    }
}
