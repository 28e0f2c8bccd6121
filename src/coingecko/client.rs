use std::time::Duration;

use color_eyre::{eyre::eyre, Result as EyreResult};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::types::{CoinDetails, CoinListItem, MarketChart, SearchResponse, SearchResult};
use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// Header carrying the demo-tier API key.
pub const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Delay before retrying when the server gives no `Retry-After`.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for honoring `Retry-After`.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// CoinGecko API client
#[derive(Clone)]
pub struct CoinGeckoClient {
  http: reqwest::Client,
  base_url: Url,
  api_key: Option<String>,
  retries: u32,
  retry_delay: Duration,
}

impl CoinGeckoClient {
  pub fn new(config: &ApiConfig) -> EyreResult<Self> {
    // Trailing slash so joins keep the /api/v3 prefix
    let base = format!("{}/", config.base_url.trim_end_matches('/'));
    let base_url =
      Url::parse(&base).map_err(|e| eyre!("Invalid API base URL {}: {}", config.base_url, e))?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .timeout(config.timeout())
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      api_key: config.api_key.clone(),
      retries: config.retries,
      retry_delay: DEFAULT_RETRY_DELAY,
    })
  }

  /// Override the delay between retries.
  pub fn with_retry_delay(mut self, delay: Duration) -> Self {
    self.retry_delay = delay;
    self
  }

  /// URL of the cheap health endpoint, used for connectivity probing.
  pub fn ping_url(&self) -> String {
    self
      .endpoint(&["ping"])
      .map(String::from)
      .unwrap_or_else(|_| self.base_url.to_string())
  }

  /// Base URL extended by `segments`, each percent-encoded as a single
  /// path segment.
  fn endpoint(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| Error::Network {
        message: format!("base URL {} cannot take a path", self.base_url),
      })?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  /// Get one page of coins ordered by market cap, with 7-day sparklines
  pub async fn get_coins(&self, page: u32, per_page: u32) -> Result<Vec<CoinListItem>> {
    self
      .get_json(
        &["coins", "markets"],
        &[
          ("vs_currency", "usd".to_string()),
          ("order", "market_cap_desc".to_string()),
          ("per_page", per_page.to_string()),
          ("page", page.to_string()),
          ("sparkline", "true".to_string()),
          ("price_change_percentage", "24h,7d".to_string()),
        ],
      )
      .await
  }

  /// Get details of a single coin
  pub async fn get_coin_details(&self, coin_id: &str) -> Result<CoinDetails> {
    self
      .get_json(
        &["coins", coin_id],
        &[
          ("localization", "false".to_string()),
          ("tickers", "false".to_string()),
          ("community_data", "false".to_string()),
          ("developer_data", "false".to_string()),
        ],
      )
      .await
  }

  /// Get price, market cap and volume history in USD
  pub async fn get_market_chart(&self, coin_id: &str, days: u32) -> Result<MarketChart> {
    self
      .get_json(
        &["coins", coin_id, "market_chart"],
        &[("vs_currency", "usd".to_string()), ("days", days.to_string())],
      )
      .await
  }

  /// Search coins by name or symbol
  pub async fn search_coins(&self, query: &str) -> Result<Vec<SearchResult>> {
    let response: SearchResponse = self
      .get_json(&["search"], &[("query", query.to_string())])
      .await?;

    Ok(response.coins)
  }

  /// GET the endpoint at `segments` and decode the JSON body, retrying
  /// transient failures.
  async fn get_json<T: DeserializeOwned>(
    &self,
    segments: &[&str],
    query: &[(&str, String)],
  ) -> Result<T> {
    let url = self.endpoint(segments)?;

    let mut attempt = 0;
    loop {
      match self.get_once(&url, query).await {
        Ok(value) => return Ok(value),
        Err(e) if e.is_retryable() && attempt < self.retries => {
          attempt += 1;
          let backoff = match &e {
            Error::RateLimited {
              retry_after: Some(retry_after),
            } => (*retry_after).min(MAX_RETRY_AFTER),
            _ => self.retry_delay,
          };

          warn!(
            url = %url,
            error = %e,
            retry = attempt,
            backoff_ms = backoff.as_millis() as u64,
            "retrying request"
          );
          tokio::time::sleep(backoff).await;
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn get_once<T: DeserializeOwned>(&self, url: &Url, query: &[(&str, String)]) -> Result<T> {
    let mut request = self.http.get(url.clone()).query(query);
    if let Some(key) = &self.api_key {
      request = request.header(API_KEY_HEADER, key);
    }

    let response = request.send().await?;
    let status = response.status();
    debug!(url = %url, status = status.as_u16(), "response");

    match status.as_u16() {
      200..=299 => Ok(response.json::<T>().await?),

      404 => Err(Error::NotFound {
        path: url.path().to_string(),
      }),

      429 => {
        let retry_after = response
          .headers()
          .get(RETRY_AFTER)
          .and_then(|v| v.to_str().ok())
          .and_then(|v| v.parse::<u64>().ok())
          .map(Duration::from_secs);

        Err(Error::RateLimited { retry_after })
      }

      code => {
        let message = response
          .text()
          .await
          .unwrap_or_else(|_| status.to_string());
        Err(Error::Http {
          status: code,
          message,
        })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Instant;
  use wiremock::matchers::{header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client(server: &MockServer, api_key: Option<&str>) -> CoinGeckoClient {
    let config = ApiConfig {
      base_url: format!("{}/api/v3", server.uri()),
      timeout_secs: 5,
      retries: 1,
      api_key: api_key.map(String::from),
    };
    CoinGeckoClient::new(&config)
      .unwrap()
      .with_retry_delay(Duration::from_millis(10))
  }

  fn coin_json(id: &str) -> serde_json::Value {
    serde_json::json!({
      "id": id, "symbol": id, "name": id, "image": "",
      "current_price": 1.0, "market_cap": 2.0, "market_cap_rank": 1,
      "fully_diluted_valuation": null, "total_volume": 3.0,
      "high_24h": 1.1, "low_24h": 0.9, "price_change_24h": 0.1,
      "price_change_percentage_24h": 10.0, "market_cap_change_24h": 0.0,
      "market_cap_change_percentage_24h": 0.0, "circulating_supply": 1.0,
      "total_supply": null, "max_supply": null, "ath": 5.0,
      "ath_change_percentage": -80.0, "ath_date": null, "atl": 0.1,
      "atl_change_percentage": 900.0, "atl_date": null, "last_updated": null
    })
  }

  #[tokio::test]
  async fn test_get_coins_sends_market_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/coins/markets"))
      .and(query_param("vs_currency", "usd"))
      .and(query_param("order", "market_cap_desc"))
      .and(query_param("per_page", "50"))
      .and(query_param("page", "2"))
      .and(query_param("sparkline", "true"))
      .and(query_param("price_change_percentage", "24h,7d"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
        coin_json("bitcoin"),
        coin_json("ethereum")
      ])))
      .expect(1)
      .mount(&server)
      .await;

    let coins = client(&server, None).get_coins(2, 50).await.unwrap();

    assert_eq!(coins.len(), 2);
    assert_eq!(coins[1].id, "ethereum");
  }

  #[tokio::test]
  async fn test_api_key_header_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/search"))
      .and(query_param("query", "sol"))
      .and(header(API_KEY_HEADER, "demo-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "coins": [{"id": "solana", "name": "Solana", "symbol": "SOL",
                   "market_cap_rank": 5, "thumb": "t", "large": "l"}]
      })))
      .mount(&server)
      .await;

    let results = client(&server, Some("demo-key"))
      .search_coins("sol")
      .await
      .unwrap();

    assert_eq!(results[0].id, "solana");
  }

  #[tokio::test]
  async fn test_market_chart_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/coins/bitcoin/market_chart"))
      .and(query_param("days", "7"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "prices": [[1000, 1.5]], "market_caps": [], "total_volumes": []
      })))
      .mount(&server)
      .await;

    let chart = client(&server, None)
      .get_market_chart("bitcoin", 7)
      .await
      .unwrap();

    assert_eq!(chart.prices, vec![(1000.0, 1.5)]);
  }

  #[tokio::test]
  async fn test_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/coins/nope"))
      .respond_with(ResponseTemplate::new(404))
      .expect(1)
      .mount(&server)
      .await;

    let err = client(&server, None)
      .get_coin_details("nope")
      .await
      .unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }));
  }

  #[tokio::test]
  async fn test_server_error_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/coins/bitcoin"))
      .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
      .expect(2)
      .mount(&server)
      .await;

    let err = client(&server, None)
      .get_coin_details("bitcoin")
      .await
      .unwrap_err();

    assert!(matches!(err, Error::Http { status: 503, .. }));
  }

  #[tokio::test]
  async fn test_rate_limited_honors_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/search"))
      .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
      .expect(2)
      .mount(&server)
      .await;

    let start = Instant::now();
    let err = client(&server, None).search_coins("x").await.unwrap_err();

    assert!(matches!(
      err,
      Error::RateLimited {
        retry_after: Some(d)
      } if d == Duration::from_secs(1)
    ));
    assert!(start.elapsed() >= Duration::from_secs(1));
  }

  #[tokio::test]
  async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/coins/markets"))
      .respond_with(ResponseTemplate::new(200).set_body_string("{\"oops\": true}"))
      .expect(1)
      .mount(&server)
      .await;

    let err = client(&server, None).get_coins(1, 50).await.unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
  }

  #[tokio::test]
  async fn test_coin_id_is_a_single_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/coins/a%2Fb/market_chart"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "prices": [], "market_caps": [], "total_volumes": []
      })))
      .expect(1)
      .mount(&server)
      .await;

    let chart = client(&server, None)
      .get_market_chart("a/b", 1)
      .await
      .unwrap();

    assert!(chart.prices.is_empty());
  }

  #[tokio::test]
  async fn test_coin_id_cannot_escape_to_other_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/search"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"coins": []})))
      .expect(0)
      .mount(&server)
      .await;

    let err = client(&server, None)
      .get_coin_details("../search")
      .await
      .unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }));
  }

  #[test]
  fn test_ping_url_keeps_prefix() {
    let config = ApiConfig::default();
    let client = CoinGeckoClient::new(&config).unwrap();
    assert_eq!(client.ping_url(), "https://api.coingecko.com/api/v3/ping");
  }
}
