use anyhow::{anyhow, Result};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type CachedValue = Arc<dyn Any + Send + Sync>;
type Slot = Arc<OnceCell<CachedValue>>;

/// Memoizes remote metadata queries by logical key.
///
/// A key is fetched at most once for the lifetime of the cache: concurrent
/// callers for the same key wait on the same fetch, and only a successful
/// fetch is stored. Entries live until [`MetadataCache::invalidate`] or
/// [`MetadataCache::clear`] is called, or the cache is dropped.
#[derive(Default)]
pub struct MetadataCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key.to_string()).or_default().clone()
    }

    /// Return the cached value for `key`, running `fetcher` if it is missing.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let slot = self.slot(key);
        let value = slot
            .get_or_try_init(|| async move {
                log::info!("Fetching remote metadata: {}", key);
                let fetched = fetcher().await?;
                Ok::<CachedValue, anyhow::Error>(Arc::new(fetched))
            })
            .await?
            .clone();

        value
            .downcast::<T>()
            .map_err(|_| anyhow!("Cached metadata for '{}' holds a different type", key))
    }

    /// Whether a successful fetch for `key` is currently memoized
    pub fn contains(&self, key: &str) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(key).map(|s| s.initialized()).unwrap_or(false)
    }

    /// Drop the memoized value for `key`; the next lookup fetches again.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let removed = slots.remove(key).is_some();
        if removed {
            log::debug!("Invalidated remote metadata: {}", key);
        }
        removed
    }

    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.clear();
    }
}
