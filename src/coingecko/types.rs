//! Serde types matching CoinGecko API responses.
//!
//! Everything here is cached verbatim, so the types round-trip through JSON
//! without loss. Fields the API sometimes returns as `null` are `Option`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Price history of the last seven days, attached to market listings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sparkline {
  #[serde(default)]
  pub price: Vec<f64>,
}

/// One row of `/coins/markets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinListItem {
  pub id: String,
  pub symbol: String,
  pub name: String,
  #[serde(default)]
  pub image: String,
  pub current_price: Option<f64>,
  pub market_cap: Option<f64>,
  pub market_cap_rank: Option<u32>,
  pub fully_diluted_valuation: Option<f64>,
  pub total_volume: Option<f64>,
  pub high_24h: Option<f64>,
  pub low_24h: Option<f64>,
  pub price_change_24h: Option<f64>,
  pub price_change_percentage_24h: Option<f64>,
  pub market_cap_change_24h: Option<f64>,
  pub market_cap_change_percentage_24h: Option<f64>,
  pub circulating_supply: Option<f64>,
  pub total_supply: Option<f64>,
  pub max_supply: Option<f64>,
  pub ath: Option<f64>,
  pub ath_change_percentage: Option<f64>,
  pub ath_date: Option<String>,
  pub atl: Option<f64>,
  pub atl_change_percentage: Option<f64>,
  pub atl_date: Option<String>,
  pub last_updated: Option<String>,
  #[serde(default)]
  pub sparkline_in_7d: Option<Sparkline>,
  #[serde(default)]
  pub price_change_percentage_7d_in_currency: Option<f64>,
}

/// Amount keyed by lowercase currency code (`"usd"`, `"eur"`, ...).
pub type CurrencyMap<T> = HashMap<String, T>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Description {
  #[serde(default)]
  pub en: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoinImage {
  #[serde(default)]
  pub thumb: String,
  #[serde(default)]
  pub small: String,
  #[serde(default)]
  pub large: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Links {
  #[serde(default)]
  pub homepage: Vec<String>,
  #[serde(default)]
  pub blockchain_site: Vec<String>,
}

/// The `market_data` block of `/coins/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketData {
  #[serde(default)]
  pub current_price: CurrencyMap<f64>,
  #[serde(default)]
  pub market_cap: CurrencyMap<f64>,
  #[serde(default)]
  pub total_volume: CurrencyMap<f64>,
  #[serde(default)]
  pub high_24h: CurrencyMap<f64>,
  #[serde(default)]
  pub low_24h: CurrencyMap<f64>,
  pub price_change_24h: Option<f64>,
  pub price_change_percentage_24h: Option<f64>,
  pub price_change_percentage_7d: Option<f64>,
  pub price_change_percentage_30d: Option<f64>,
  pub market_cap_rank: Option<u32>,
  pub circulating_supply: Option<f64>,
  pub total_supply: Option<f64>,
  pub max_supply: Option<f64>,
  #[serde(default)]
  pub ath: CurrencyMap<f64>,
  #[serde(default)]
  pub ath_date: CurrencyMap<String>,
  #[serde(default)]
  pub atl: CurrencyMap<f64>,
  #[serde(default)]
  pub atl_date: CurrencyMap<String>,
}

impl MarketData {
  pub fn price_in(&self, currency: &str) -> Option<f64> {
    self.current_price.get(currency).copied()
  }
}

/// `/coins/{id}` with localization, tickers and community/developer data off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetails {
  pub id: String,
  pub symbol: String,
  pub name: String,
  #[serde(default)]
  pub description: Description,
  #[serde(default)]
  pub image: CoinImage,
  #[serde(default)]
  pub market_data: MarketData,
  #[serde(default)]
  pub links: Links,
}

/// `/coins/{id}/market_chart`: `[timestamp_millis, value]` series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketChart {
  #[serde(default)]
  pub prices: Vec<(f64, f64)>,
  #[serde(default)]
  pub market_caps: Vec<(f64, f64)>,
  #[serde(default)]
  pub total_volumes: Vec<(f64, f64)>,
}

/// One coin hit of `/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
  pub id: String,
  pub name: String,
  pub symbol: String,
  pub market_cap_rank: Option<u32>,
  #[serde(default)]
  pub thumb: String,
  #[serde(default)]
  pub large: String,
}

/// Envelope of `/search`; only the coin hits are used.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
  #[serde(default)]
  pub coins: Vec<SearchResult>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_market_listing_with_nulls() {
    let json = r#"[{
      "id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
      "image": "https://img/btc.png",
      "current_price": 67000.5, "market_cap": 1.3e12, "market_cap_rank": 1,
      "fully_diluted_valuation": null, "total_volume": 2.1e10,
      "high_24h": 68000, "low_24h": 66000,
      "price_change_24h": 120.2, "price_change_percentage_24h": 0.18,
      "market_cap_change_24h": 1e9, "market_cap_change_percentage_24h": 0.1,
      "circulating_supply": 19700000, "total_supply": 21000000, "max_supply": null,
      "ath": 73000, "ath_change_percentage": -8.1, "ath_date": "2024-03-14T07:10:36.635Z",
      "atl": 67.81, "atl_change_percentage": 98000, "atl_date": "2013-07-06T00:00:00.000Z",
      "last_updated": "2024-06-01T12:00:00.000Z",
      "sparkline_in_7d": {"price": [1.0, 2.0, 3.0]},
      "price_change_percentage_7d_in_currency": 2.5
    }]"#;

    let coins: Vec<CoinListItem> = serde_json::from_str(json).unwrap();
    assert_eq!(coins.len(), 1);
    assert_eq!(coins[0].id, "bitcoin");
    assert_eq!(coins[0].max_supply, None);
    assert_eq!(coins[0].sparkline_in_7d.as_ref().unwrap().price.len(), 3);
  }

  #[test]
  fn test_details_per_currency_prices() {
    let json = r#"{
      "id": "ethereum", "symbol": "eth", "name": "Ethereum",
      "description": {"en": "Smart contracts"},
      "image": {"thumb": "t", "small": "s", "large": "l"},
      "market_data": {
        "current_price": {"usd": 3500.0, "eur": 3200.0},
        "market_cap_rank": 2,
        "total_supply": null
      },
      "links": {"homepage": ["https://ethereum.org"], "blockchain_site": []}
    }"#;

    let details: CoinDetails = serde_json::from_str(json).unwrap();
    assert_eq!(details.market_data.price_in("usd"), Some(3500.0));
    assert_eq!(details.market_data.price_in("jpy"), None);
    assert_eq!(details.market_data.market_cap_rank, Some(2));
  }

  #[test]
  fn test_market_chart_pairs() {
    let json = r#"{
      "prices": [[1711843200000, 70000.1], [1711846800000, 70100.2]],
      "market_caps": [[1711843200000, 1.38e12]],
      "total_volumes": []
    }"#;

    let chart: MarketChart = serde_json::from_str(json).unwrap();
    assert_eq!(chart.prices[1], (1711846800000.0, 70100.2));
    assert!(chart.total_volumes.is_empty());
  }

  #[test]
  fn test_search_envelope_ignores_other_sections() {
    let json = r#"{
      "coins": [{"id": "solana", "name": "Solana", "symbol": "SOL",
                 "market_cap_rank": 5, "thumb": "t", "large": "l"}],
      "exchanges": [], "categories": [], "nfts": []
    }"#;

    let response: SearchResponse = serde_json::from_str(json).unwrap();
    assert_eq!(response.coins[0].symbol, "SOL");
  }
}
