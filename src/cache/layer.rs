//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::storage::CacheStorage;
use super::traits::{CacheEntry, CacheResult, Cacheable};

/// Cache layer that manages freshness and network fetching.
///
/// This layer sits between the query facade and the remote client. It is the
/// only write path into its storage.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  /// How long cached data is considered fresh
  stale_time: Duration,
  /// Upper bound for a single fetch
  timeout: Option<std::time::Duration>,
  /// Per-key refresh locks, so concurrent misses share one fetch
  inflight: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      stale_time: Duration::minutes(5),
      timeout: None,
      inflight: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Set the freshness window for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Bound every fetch by `timeout`. An elapsed fetch counts as a failure.
  pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  /// Get the entry for `key` regardless of freshness.
  pub fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
    self.storage.get(key)
  }

  /// Store `payload` under `key`, stamped with the current time.
  pub fn set<T: Cacheable>(&self, key: &str, payload: T) -> Result<()> {
    self.storage.set(key, payload, Utc::now())
  }

  /// Check whether an entry is younger than the freshness window.
  pub fn is_fresh<T>(&self, entry: &CacheEntry<T>) -> bool {
    self.is_fresh_at(entry, Utc::now())
  }

  pub fn is_fresh_at<T>(&self, entry: &CacheEntry<T>, now: DateTime<Utc>) -> bool {
    now - entry.fetched_at < self.stale_time
  }

  /// Drop every cached entry.
  pub fn clear(&self) -> Result<()> {
    self.storage.clear()
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Check cache - if fresh, return immediately
  /// 2. If stale/missing, fetch from network (one fetch per key at a time)
  /// 3. On network failure, return stale cache (offline mode)
  /// 4. On network failure without cache, return the error
  pub async fn fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some(cached) = self.fresh_entry::<T>(key)? {
      debug!(key, entity = T::entity_type(), "cache hit");
      return Ok(CacheResult::from_cache(cached.payload, cached.fetched_at));
    }

    let lock = {
      let mut map = self.inflight.lock().await;
      Arc::clone(
        map
          .entry(key.to_string())
          .or_insert_with(|| Arc::new(Mutex::new(()))),
      )
    };

    let result = {
      let _guard = lock.lock().await;
      self.refresh(key, fetcher).await
    };

    // Drop the key's lock once nobody else is waiting on it. Our handle goes
    // away before the map is unlocked so a later waiter sees an exact count.
    let mut map = self.inflight.lock().await;
    if Arc::strong_count(&lock) == 2 {
      map.remove(key);
    }
    drop(lock);
    drop(map);

    result
  }

  /// Refresh `key` while holding its lock.
  async fn refresh<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    // Another caller may have refreshed the entry while we waited
    let cached = self.storage.get::<T>(key)?;
    if let Some(cached) = &cached {
      if self.is_fresh(cached) {
        debug!(key, entity = T::entity_type(), "cache filled by concurrent fetch");
        return Ok(CacheResult::from_cache(cached.payload.clone(), cached.fetched_at));
      }
    }

    debug!(key, entity = T::entity_type(), "fetching from network");
    match self.run_fetch(fetcher).await {
      Ok(data) => {
        self.set(key, data.clone())?;
        Ok(CacheResult::from_network(data))
      }
      Err(e) => match cached {
        Some(cached) => Ok(CacheResult::offline(
          cached.payload,
          cached.fetched_at,
          e.to_string(),
        )),
        None => Err(e),
      },
    }
  }

  fn fresh_entry<T: Cacheable>(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
    Ok(self.storage.get::<T>(key)?.filter(|e| self.is_fresh(e)))
  }

  async fn run_fetch<T, F, Fut>(&self, fetcher: F) -> Result<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    match self.timeout {
      Some(limit) => tokio::time::timeout(limit, fetcher())
        .await
        .map_err(|_| eyre!("Request timed out after {}s", limit.as_secs_f32()))?,
      None => fetcher().await,
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      stale_time: self.stale_time,
      timeout: self.timeout,
      inflight: Arc::clone(&self.inflight),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::MemoryStorage;
  use crate::cache::traits::CacheSource;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[derive(Debug, Clone, PartialEq)]
  struct Row(u32);

  impl Cacheable for Row {
    fn entity_type() -> &'static str {
      "row"
    }
  }

  fn layer() -> CacheLayer<MemoryStorage> {
    CacheLayer::new(MemoryStorage::new())
  }

  #[test]
  fn test_freshness_boundary() {
    let cache = layer().with_stale_time(Duration::minutes(5));
    let t = Utc::now();
    let entry = CacheEntry {
      payload: Row(1),
      fetched_at: t,
    };
    let eps = Duration::milliseconds(1);

    assert!(cache.is_fresh_at(&entry, t));
    assert!(cache.is_fresh_at(&entry, t + Duration::minutes(5) - eps));
    assert!(!cache.is_fresh_at(&entry, t + Duration::minutes(5)));
    assert!(!cache.is_fresh_at(&entry, t + Duration::minutes(5) + eps));
  }

  #[test]
  fn test_get_returns_stale_entries() {
    let cache = layer().with_stale_time(Duration::zero());
    cache.set("k", vec![Row(1)]).unwrap();

    let entry = cache.get::<Vec<Row>>("k").unwrap().unwrap();
    assert!(!cache.is_fresh(&entry));
    assert_eq!(entry.payload, vec![Row(1)]);
  }

  #[tokio::test]
  async fn test_fresh_entry_skips_network() {
    let cache = layer();
    let calls = AtomicU32::new(0);

    for _ in 0..2 {
      let result = cache
        .fetch("k", || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(vec![Row(7)])
        })
        .await
        .unwrap();
      assert_eq!(result.data, vec![Row(7)]);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_stale_entry_refreshes() {
    let cache = layer().with_stale_time(Duration::zero());
    cache.set("k", Row(1)).unwrap();

    let result = cache.fetch("k", || async { Ok(Row(2)) }).await.unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(result.data, Row(2));
    assert_eq!(cache.get::<Row>("k").unwrap().unwrap().payload, Row(2));
  }

  #[tokio::test]
  async fn test_failure_falls_back_to_stale_entry() {
    let cache = layer().with_stale_time(Duration::zero());
    cache.set("k", Row(1)).unwrap();

    let result = cache
      .fetch::<Row, _, _>("k", || async { Err(eyre!("connection refused")) })
      .await
      .unwrap();

    assert_eq!(result.source, CacheSource::Offline);
    assert_eq!(result.data, Row(1));
    assert_eq!(result.error.as_deref(), Some("connection refused"));
  }

  #[tokio::test]
  async fn test_failure_without_entry_is_an_error() {
    let cache = layer();
    let result = cache
      .fetch::<Row, _, _>("k", || async { Err(eyre!("boom")) })
      .await;

    assert!(result.is_err());
    assert!(cache.get::<Row>("k").unwrap().is_none());
  }

  #[tokio::test]
  async fn test_concurrent_misses_share_one_fetch() {
    let cache = layer();
    let calls = Arc::new(AtomicU32::new(0));

    let fetch = |cache: CacheLayer<MemoryStorage>, calls: Arc<AtomicU32>| async move {
      cache
        .fetch("k", || async move {
          calls.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(std::time::Duration::from_millis(20)).await;
          Ok(Row(3))
        })
        .await
        .unwrap()
    };

    let (a, b) = tokio::join!(
      fetch(cache.clone(), calls.clone()),
      fetch(cache.clone(), calls.clone())
    );

    assert_eq!(a.data, Row(3));
    assert_eq!(b.data, Row(3));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refresh_locks_are_released() {
    let cache = layer().with_stale_time(Duration::zero());

    for page in ["hero", "about", "contact"] {
      cache.fetch(page, || async { Ok(Row(1)) }).await.unwrap();
    }
    let _ = cache
      .fetch::<Row, _, _>("missing", || async { Err(eyre!("boom")) })
      .await;

    assert!(cache.inflight.lock().await.is_empty());
  }

  #[tokio::test]
  async fn test_timeout_counts_as_failure() {
    let cache = layer().with_timeout(std::time::Duration::from_millis(10));
    let result = cache
      .fetch("k", || async {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok(Row(1))
      })
      .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("timed out"));
  }

  #[test]
  fn test_clear() {
    let cache = layer();
    cache.set("a", Row(1)).unwrap();
    cache.clear().unwrap();
    assert!(cache.get::<Row>("a").unwrap().is_none());
  }
}
