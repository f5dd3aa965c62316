//! Read-through cache for slow-changing reference data.
//!
//! Holds at most one `(value, fetched_at)` entry. A stale entry is refreshed
//! on the next read; if the refresh fails the expired value is served rather
//! than failing the request. Idea counters and vote state never go through
//! here.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domains::{Clock, Result};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// An entry from the future (clock moved backwards) counts as fresh.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        (now - self.fetched_at)
            .to_std()
            .map(|age| age >= ttl)
            .unwrap_or(false)
    }
}

pub struct ReferenceCache<T> {
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<CacheEntry<T>>>,
    /// Bumped by `invalidate`; a refresh that started under an older
    /// generation does not write back.
    generation: AtomicU64,
}

impl<T: Clone + Send + Sync> ReferenceCache<T> {
    /// Starts empty; the first read always goes to the store.
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            clock,
            slot: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let now = self.clock.now();
        if let Some(entry) = self.slot.read().await.as_ref() {
            if !entry.is_stale(now, self.ttl) {
                return Ok(entry.value.clone());
            }
        }

        let started = self.generation.load(Ordering::Acquire);
        match fetch().await {
            Ok(value) => {
                let mut slot = self.slot.write().await;
                if self.generation.load(Ordering::Acquire) == started {
                    debug!(cache = self.name, "reference data refreshed");
                    *slot = Some(CacheEntry {
                        value: value.clone(),
                        fetched_at: now,
                    });
                } else {
                    debug!(cache = self.name, "invalidated during refresh, result not cached");
                }
                Ok(value)
            }
            Err(e) => match self.slot.read().await.as_ref() {
                Some(expired) => {
                    warn!(cache = self.name, error = %e, "refresh failed, serving expired reference data");
                    Ok(expired.value.clone())
                }
                None => Err(e),
            },
        }
    }

    /// Forces the next read to hit the store.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        *slot = None;
    }

    pub async fn peek(&self) -> Option<CacheEntry<T>> {
        self.slot.read().await.clone()
    }
}
