//! Timestamped cache entries on top of a [`KvStore`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, warn};

use super::types::{CacheEntry, CacheInfo, CachedEntry, Freshness};
use crate::store::KvStore;

/// Prefix separating cache entries from unrelated persisted state.
pub const CACHE_PREFIX: &str = "crypto_cache_";

/// Default time-to-live: 10 minutes.
pub const DEFAULT_TTL_SECS: i64 = 10 * 60;

/// Cache entry store.
///
/// Owns the lifecycle of every `crypto_cache_*` key. Failures never escape:
/// a broken read is a miss and a broken write is logged and dropped, so the
/// caller's data flow is never interrupted by the cache.
#[derive(Clone)]
pub struct CacheStore {
  store: Arc<dyn KvStore>,
  ttl: Duration,
}

impl CacheStore {
  pub fn new(store: Arc<dyn KvStore>) -> Self {
    Self {
      store,
      ttl: Duration::seconds(DEFAULT_TTL_SECS),
    }
  }

  /// Set the TTL after which entries count as stale.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  fn namespaced(key: &str) -> String {
    format!("{}{}", CACHE_PREFIX, key)
  }

  /// Classify an entry stored at `stored_at` against the current time.
  pub fn freshness(&self, stored_at: DateTime<Utc>) -> Freshness {
    if Utc::now() - stored_at < self.ttl {
      Freshness::Fresh
    } else {
      Freshness::Stale
    }
  }

  /// Persist `payload` under `key`, stamped with the current time.
  pub async fn write<T: Serialize + ?Sized>(&self, key: &str, payload: &T) {
    let entry = CacheEntry {
      payload,
      stored_at: Utc::now(),
    };

    let bytes = match serde_json::to_vec(&entry) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!(key, error = %e, "failed to serialize cache entry");
        return;
      }
    };

    match self.store.set(&Self::namespaced(key), &bytes).await {
      Ok(()) => debug!(key, bytes = bytes.len(), "cache entry written"),
      Err(e) => warn!(key, error = %e, "cache write failed"),
    }
  }

  /// Read the entry for `key` with its freshness.
  ///
  /// Returns `None` when nothing is stored, when the entry cannot be decoded,
  /// or when it is stale and `allow_stale` is false.
  pub async fn read_entry<T: DeserializeOwned>(
    &self,
    key: &str,
    allow_stale: bool,
  ) -> Option<CachedEntry<T>> {
    let bytes = match self.store.get(&Self::namespaced(key)).await {
      Ok(Some(bytes)) => bytes,
      Ok(None) => return None,
      Err(e) => {
        warn!(key, error = %e, "cache read failed");
        return None;
      }
    };

    let entry: CacheEntry<T> = match serde_json::from_slice(&bytes) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(key, error = %e, "corrupt cache entry, treating as miss");
        return None;
      }
    };

    let freshness = self.freshness(entry.stored_at);
    if freshness == Freshness::Stale && !allow_stale {
      return None;
    }

    Some(CachedEntry {
      payload: entry.payload,
      stored_at: entry.stored_at,
      freshness,
    })
  }

  /// Read the payload for `key`. See [`CacheStore::read_entry`].
  pub async fn read<T: DeserializeOwned>(&self, key: &str, allow_stale: bool) -> Option<T> {
    self
      .read_entry(key, allow_stale)
      .await
      .map(|entry| entry.payload)
  }

  /// Last-resort read that accepts data of any age.
  pub async fn read_stale_only<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    self.read(key, true).await
  }

  /// Whether a decodable entry younger than the TTL exists for `key`.
  pub async fn is_fresh(&self, key: &str) -> bool {
    self.read_entry::<IgnoredAny>(key, false).await.is_some()
  }

  /// Remove the entry for `key`, if any.
  pub async fn clear(&self, key: &str) {
    if let Err(e) = self.store.remove(&Self::namespaced(key)).await {
      warn!(key, error = %e, "cache clear failed");
    }
  }

  /// Remove every cache entry, leaving unrelated keys alone.
  pub async fn clear_all(&self) {
    let keys = match self.cache_keys().await {
      Some(keys) => keys,
      None => return,
    };

    match self.store.remove_many(&keys).await {
      Ok(()) => debug!(count = keys.len(), "cache cleared"),
      Err(e) => warn!(error = %e, "cache clear all failed"),
    }
  }

  /// Count entries and find the oldest and newest write times.
  pub async fn info(&self) -> CacheInfo {
    let keys = match self.cache_keys().await {
      Some(keys) => keys,
      None => return CacheInfo::default(),
    };

    let mut info = CacheInfo {
      count: keys.len(),
      ..CacheInfo::default()
    };

    for key in &keys {
      let stored_at = match self.store.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice::<CacheEntry<IgnoredAny>>(&bytes) {
          Ok(entry) => entry.stored_at,
          Err(e) => {
            warn!(key = %key, error = %e, "skipping corrupt cache entry");
            continue;
          }
        },
        Ok(None) => continue,
        Err(e) => {
          warn!(key = %key, error = %e, "cache read failed");
          continue;
        }
      };

      info.oldest = Some(info.oldest.map_or(stored_at, |t| t.min(stored_at)));
      info.newest = Some(info.newest.map_or(stored_at, |t| t.max(stored_at)));
    }

    info
  }

  async fn cache_keys(&self) -> Option<Vec<String>> {
    match self.store.keys().await {
      Ok(keys) => Some(
        keys
          .into_iter()
          .filter(|k| k.starts_with(CACHE_PREFIX))
          .collect(),
      ),
      Err(e) => {
        warn!(error = %e, "failed to list cache keys");
        None
      }
    }
  }
}
