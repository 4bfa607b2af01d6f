//! In-memory caching layer with a fixed freshness window.
//!
//! This module provides a content-agnostic caching mechanism that:
//! - Holds one typed entry per key, replaced wholesale on refresh
//! - Serves fresh entries without touching the network
//! - Serializes concurrent refreshes of the same key
//! - Provides basic offline mode (serve stale cache when network unavailable)

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, MemoryStorage};
pub use traits::{CacheEntry, CacheResult, CacheSource, Cacheable};
