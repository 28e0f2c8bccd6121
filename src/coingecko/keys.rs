//! Cache keys for CoinGecko resources.

use std::fmt;

/// A cacheable CoinGecko request.
///
/// Two logically identical requests always render to the same key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKey {
  /// One page of the market-cap ordered coin list
  CoinsPage { page: u32, per_page: u32 },
  /// Detail view of one coin
  CoinDetails { coin_id: String },
  /// Price/market-cap/volume history of one coin
  MarketChart { coin_id: String, days: u32 },
  /// Free-text coin search
  Search { query: String },
}

impl ResourceKey {
  /// Build a search key, normalizing the query.
  pub fn search(query: &str) -> Self {
    Self::Search {
      query: normalize_query(query),
    }
  }

  pub fn description(&self) -> String {
    match self {
      Self::CoinsPage { page, per_page } => {
        format!("coins page {} ({} per page)", page, per_page)
      }
      Self::CoinDetails { coin_id } => format!("details for {}", coin_id),
      Self::MarketChart { coin_id, days } => format!("{} day chart for {}", days, coin_id),
      Self::Search { query } => format!("search: {}", query),
    }
  }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::CoinsPage { page, per_page } => write!(f, "coins_page_{}_per_{}", page, per_page),
      Self::CoinDetails { coin_id } => write!(f, "coin_details_{}", coin_id),
      Self::MarketChart { coin_id, days } => write!(f, "market_chart_{}_{}", coin_id, days),
      Self::Search { query } => write!(f, "search_{}", query),
    }
  }
}

/// Normalize a search query for consistent keys.
/// Trims whitespace and lowercases for case-insensitive matching.
fn normalize_query(query: &str) -> String {
  query.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_key_formats() {
    assert_eq!(
      ResourceKey::CoinsPage {
        page: 2,
        per_page: 50
      }
      .to_string(),
      "coins_page_2_per_50"
    );
    assert_eq!(
      ResourceKey::CoinDetails {
        coin_id: "bitcoin".into()
      }
      .to_string(),
      "coin_details_bitcoin"
    );
    assert_eq!(
      ResourceKey::MarketChart {
        coin_id: "ethereum".into(),
        days: 30
      }
      .to_string(),
      "market_chart_ethereum_30"
    );
    assert_eq!(ResourceKey::search("Doge").to_string(), "search_doge");
  }

  #[test]
  fn test_search_normalization() {
    assert_eq!(ResourceKey::search("  BiTcoin "), ResourceKey::search("bitcoin"));
  }
}
