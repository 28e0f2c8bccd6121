//! Core types for the caching system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// Persisted form of a cached payload.
///
/// `stored_at` is stamped once when the entry is written and never touched
/// again; a later write replaces the whole entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub payload: T,
  pub stored_at: DateTime<Utc>,
}

/// Age tier of a cache entry relative to the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  /// Younger than the TTL
  Fresh,
  /// At or past the TTL, still usable as a fallback
  Stale,
}

/// A decoded entry along with its freshness at read time.
#[derive(Debug, Clone)]
pub struct CachedEntry<T> {
  pub payload: T,
  pub stored_at: DateTime<Utc>,
  pub freshness: Freshness,
}

/// Diagnostic summary over every namespaced entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheInfo {
  /// Number of namespaced keys, readable or not
  pub count: usize,
  /// Oldest `stored_at` among readable entries
  pub oldest: Option<DateTime<Utc>>,
  /// Newest `stored_at` among readable entries
  pub newest: Option<DateTime<Utc>>,
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the network while the caller waited
  Network,
  /// Fresh cache hit while online; a background refresh was started
  CacheFresh,
  /// Offline, serving whatever the cache had
  Offline,
}

/// Result of a cached read, including data and metadata about the source.
#[derive(Debug)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub stored_at: Option<DateTime<Utc>>,
  /// Freshness of the cached data (if from cache)
  pub freshness: Option<Freshness>,
  /// Detached background refresh, if one was started.
  ///
  /// Dropping the handle does not cancel the refresh.
  pub revalidation: Option<JoinHandle<()>>,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      stored_at: None,
      freshness: None,
      revalidation: None,
    }
  }

  pub fn revalidating(entry: CachedEntry<T>, revalidation: JoinHandle<()>) -> Self {
    Self {
      data: entry.payload,
      source: CacheSource::CacheFresh,
      stored_at: Some(entry.stored_at),
      freshness: Some(entry.freshness),
      revalidation: Some(revalidation),
    }
  }

  pub fn offline(entry: CachedEntry<T>) -> Self {
    Self {
      data: entry.payload,
      source: CacheSource::Offline,
      stored_at: Some(entry.stored_at),
      freshness: Some(entry.freshness),
      revalidation: None,
    }
  }

  pub fn is_stale(&self) -> bool {
    self.freshness == Some(Freshness::Stale)
  }

  pub fn into_data(self) -> T {
    self.data
  }
}
