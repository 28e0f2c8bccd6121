//! CoinGecko market-data source and its cached front.

mod cached_client;
mod client;
mod keys;
mod types;

pub use cached_client::{CachedCoinClient, DEFAULT_CHART_DAYS, DEFAULT_PAGE, DEFAULT_PER_PAGE};
pub use client::{CoinGeckoClient, API_KEY_HEADER};
pub use keys::ResourceKey;
pub use types::{
  CoinDetails, CoinImage, CoinListItem, CurrencyMap, Description, Links, MarketChart, MarketData,
  SearchResult, Sparkline,
};
