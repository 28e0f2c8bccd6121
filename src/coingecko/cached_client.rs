//! Cached CoinGecko client that wraps CoinGeckoClient with transparent caching.

use std::sync::Arc;

use color_eyre::Result as EyreResult;

use crate::cache::{CacheInfo, CacheLayer, CacheResult, CacheStore};
use crate::config::Config;
use crate::connectivity::{Connectivity, HttpProbe};
use crate::error::Result;
use crate::store::{KvStore, NoopStore};

use super::client::CoinGeckoClient;
use super::keys::ResourceKey;
use super::types::{CoinDetails, CoinListItem, MarketChart, SearchResult};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 50;
pub const DEFAULT_CHART_DAYS: u32 = 7;

/// CoinGecko client with transparent caching support.
///
/// This wraps the underlying CoinGeckoClient and provides the same API,
/// but serves cached data when possible, refreshes it in the background
/// and keeps working offline.
#[derive(Clone)]
pub struct CachedCoinClient {
  inner: CoinGeckoClient,
  cache: CacheLayer,
}

impl CachedCoinClient {
  /// Create a cached client from configuration, persisting into `store`.
  ///
  /// Connectivity is decided by probing the API's ping endpoint. When
  /// caching is disabled `store` is ignored and nothing is persisted.
  pub fn new(config: &Config, store: Arc<dyn KvStore>) -> EyreResult<Self> {
    let inner = CoinGeckoClient::new(&config.api)?;
    let probe = HttpProbe::new(inner.ping_url(), config.connectivity.probe_timeout())?;

    Self::from_config(config, inner, store, Arc::new(probe))
  }

  /// Create a cached client from configuration with a custom connectivity
  /// source.
  pub fn with_connectivity(
    config: &Config,
    store: Arc<dyn KvStore>,
    connectivity: Arc<dyn Connectivity>,
  ) -> EyreResult<Self> {
    let inner = CoinGeckoClient::new(&config.api)?;
    Self::from_config(config, inner, store, connectivity)
  }

  fn from_config(
    config: &Config,
    inner: CoinGeckoClient,
    store: Arc<dyn KvStore>,
    connectivity: Arc<dyn Connectivity>,
  ) -> EyreResult<Self> {
    let store: Arc<dyn KvStore> = if config.cache.enabled {
      store
    } else {
      Arc::new(NoopStore)
    };

    Ok(Self::with_parts(
      inner,
      CacheStore::new(store).with_ttl(config.cache.ttl()?),
      connectivity,
    ))
  }

  /// Assemble from explicit parts.
  pub fn with_parts(
    inner: CoinGeckoClient,
    cache: CacheStore,
    connectivity: Arc<dyn Connectivity>,
  ) -> Self {
    Self {
      inner,
      cache: CacheLayer::new(cache, connectivity),
    }
  }

  /// Get one page of coins ordered by market cap.
  pub async fn get_coins(&self, page: u32, per_page: u32) -> Result<CacheResult<Vec<CoinListItem>>> {
    let key = ResourceKey::CoinsPage { page, per_page };
    let inner = self.inner.clone();

    self
      .cache
      .fetch(&key.to_string(), move || async move {
        inner.get_coins(page, per_page).await
      })
      .await
  }

  /// Get details of a single coin.
  pub async fn get_coin_details(&self, coin_id: &str) -> Result<CacheResult<CoinDetails>> {
    let key = ResourceKey::CoinDetails {
      coin_id: coin_id.to_string(),
    };
    let inner = self.inner.clone();
    let coin_id = coin_id.to_string();

    self
      .cache
      .fetch(&key.to_string(), move || async move {
        inner.get_coin_details(&coin_id).await
      })
      .await
  }

  /// Get the price history of a coin over `days`.
  pub async fn get_market_chart(
    &self,
    coin_id: &str,
    days: u32,
  ) -> Result<CacheResult<MarketChart>> {
    let key = ResourceKey::MarketChart {
      coin_id: coin_id.to_string(),
      days,
    };
    let inner = self.inner.clone();
    let coin_id = coin_id.to_string();

    self
      .cache
      .fetch(&key.to_string(), move || async move {
        inner.get_market_chart(&coin_id, days).await
      })
      .await
  }

  /// Search coins. Queries differing only in case or surrounding
  /// whitespace share a cache entry.
  pub async fn search_coins(&self, query: &str) -> Result<CacheResult<Vec<SearchResult>>> {
    let key = ResourceKey::search(query);
    let inner = self.inner.clone();
    let query = query.trim().to_string();

    self
      .cache
      .fetch(&key.to_string(), move || async move {
        inner.search_coins(&query).await
      })
      .await
  }

  /// Drop every cached entry.
  pub async fn clear_cache(&self) {
    self.cache.cache().clear_all().await
  }

  /// Summary of what is cached.
  pub async fn cache_info(&self) -> CacheInfo {
    self.cache.cache().info().await
  }
}
