//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{CacheEntry, Cacheable};

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under `key`, if any.
  ///
  /// An entry holding a payload of a different type is reported as absent.
  fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CacheEntry<T>>>;

  /// Replace the entry stored under `key`.
  fn set<T: Cacheable>(&self, key: &str, payload: T, fetched_at: DateTime<Utc>) -> Result<()>;

  /// Drop every entry.
  fn clear(&self) -> Result<()>;
}

struct Slot {
  payload: Arc<dyn Any + Send + Sync>,
  fetched_at: DateTime<Utc>,
}

/// Process-local storage. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
  slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
    let slots = self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(slots.get(key).and_then(|slot| {
      slot.payload.downcast_ref::<T>().map(|payload| CacheEntry {
        payload: payload.clone(),
        fetched_at: slot.fetched_at,
      })
    }))
  }

  fn set<T: Cacheable>(&self, key: &str, payload: T, fetched_at: DateTime<Utc>) -> Result<()> {
    let mut slots = self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    slots.insert(
      key.to_string(),
      Slot {
        payload: Arc::new(payload),
        fetched_at,
      },
    );
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .clear();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, PartialEq)]
  struct Note(String);

  impl Cacheable for Note {
    fn entity_type() -> &'static str {
      "note"
    }
  }

  #[test]
  fn test_set_then_get() {
    let storage = MemoryStorage::new();
    let at = Utc::now();
    storage.set("k", vec![Note("a".into())], at).unwrap();

    let entry = storage.get::<Vec<Note>>("k").unwrap().unwrap();
    assert_eq!(entry.payload, vec![Note("a".into())]);
    assert_eq!(entry.fetched_at, at);
  }

  #[test]
  fn test_set_replaces_wholesale() {
    let storage = MemoryStorage::new();
    storage
      .set("k", vec![Note("a".into()), Note("b".into())], Utc::now())
      .unwrap();
    storage.set("k", vec![Note("c".into())], Utc::now()).unwrap();

    let entry = storage.get::<Vec<Note>>("k").unwrap().unwrap();
    assert_eq!(entry.payload, vec![Note("c".into())]);
  }

  #[test]
  fn test_type_mismatch_reads_as_absent() {
    let storage = MemoryStorage::new();
    storage.set("k", Note("a".into()), Utc::now()).unwrap();
    assert!(storage.get::<Vec<Note>>("k").unwrap().is_none());
  }

  #[test]
  fn test_clear_drops_everything() {
    let storage = MemoryStorage::new();
    storage.set("a", Note("1".into()), Utc::now()).unwrap();
    storage.set("b", Note("2".into()), Utc::now()).unwrap();
    storage.clear().unwrap();

    assert!(storage.get::<Note>("a").unwrap().is_none());
    assert!(storage.get::<Note>("b").unwrap().is_none());
  }
}
