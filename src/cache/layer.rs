//! Cache layer that orchestrates caching logic with network fetching.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::store::CacheStore;
use super::types::CacheResult;
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};

/// Cache layer that decides between network, cache, or both.
///
/// This layer sits between the application and the network client,
/// providing stale-while-revalidate reads with offline support.
#[derive(Clone)]
pub struct CacheLayer {
  cache: CacheStore,
  connectivity: Arc<dyn Connectivity>,
}

impl CacheLayer {
  pub fn new(cache: CacheStore, connectivity: Arc<dyn Connectivity>) -> Self {
    Self {
      cache,
      connectivity,
    }
  }

  /// The underlying entry store, for cache management.
  pub fn cache(&self) -> &CacheStore {
    &self.cache
  }

  /// Read `key` through the cache.
  ///
  /// 1. Ask the connectivity oracle whether we are online
  /// 2. Online: only a fresh entry counts as a hit; offline: any entry does
  /// 3. Online hit: return it and refresh in a detached background task
  /// 4. Online miss: fetch, write back, return; fetch errors propagate
  /// 5. Offline hit: return it, no network
  /// 6. Offline miss: last-resort stale read, else [`Error::NoCachedData`]
  pub async fn fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let online = self.connectivity.is_online().await;

    if let Some(cached) = self.cache.read_entry::<T>(key, !online).await {
      if !online {
        debug!(key, freshness = ?cached.freshness, "offline, using cached data");
        return Ok(CacheResult::offline(cached));
      }

      debug!(key, "using cached data, fetching fresh in background");
      let revalidation = self.spawn_refresh(key, fetcher());
      return Ok(CacheResult::revalidating(cached, revalidation));
    }

    if !online {
      if let Some(stale) = self.cache.read_entry::<T>(key, true).await {
        debug!(key, "offline, using stale cache");
        return Ok(CacheResult::offline(stale));
      }
      warn!(key, "offline with no cached data");
      return Err(Error::NoCachedData {
        key: key.to_string(),
      });
    }

    info!(key, "fetching fresh data");
    let data = fetcher().await?;
    self.cache.write(key, &data).await;
    Ok(CacheResult::from_network(data))
  }

  /// Run `refresh` detached, writing its result back on success.
  fn spawn_refresh<T, Fut>(&self, key: &str, refresh: Fut) -> tokio::task::JoinHandle<()>
  where
    T: Serialize + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let cache = self.cache.clone();
    let key = key.to_string();

    tokio::spawn(async move {
      match refresh.await {
        Ok(fresh) => {
          cache.write(&key, &fresh).await;
          debug!(key = %key, "fresh data cached");
        }
        Err(e) => {
          warn!(key = %key, error = %e, "background fetch failed");
        }
      }
    })
  }
}
