//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

/// Trait for payloads that can be held in the cache.
///
/// Payloads are immutable snapshots: the cache hands out clones and replaces
/// an entry wholesale on refresh.
pub trait Cacheable: Clone + Send + Sync + 'static {
  /// Entity type name for log output (e.g., "project", "about")
  fn entity_type() -> &'static str;
}

impl<T: Cacheable> Cacheable for Vec<T> {
  fn entity_type() -> &'static str {
    T::entity_type()
  }
}

impl<T: Cacheable> Cacheable for Option<T> {
  fn entity_type() -> &'static str {
    T::entity_type()
  }
}

/// A cached payload together with the time it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
  pub payload: T,
  pub fetched_at: DateTime<Utc>,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
  /// Why the network could not be used (offline mode only)
  pub error: Option<String>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
      error: None,
    }
  }

  /// Create a new cache result from a fresh cache entry.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
      error: None,
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T, cached_at: DateTime<Utc>, error: String) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
      error: Some(error),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Offline mode - network unavailable, serving cached data
  Offline,
}
