//! Offline-first caching layer for remote market data.
//!
//! This module provides an API-agnostic caching mechanism that:
//! - Persists payloads with the time they were stored
//! - Classifies entries as fresh or stale against a TTL
//! - Serves cached data immediately and revalidates in the background
//! - Falls back to stale data of any age while offline

mod layer;
mod store;
mod types;

pub use layer::CacheLayer;
pub use store::{CacheStore, CACHE_PREFIX, DEFAULT_TTL_SECS};
pub use types::{CacheEntry, CacheInfo, CacheResult, CacheSource, CachedEntry, Freshness};
