//! Error types for the market-data read path.

use std::time::Duration;

/// Errors surfaced to callers of the cached read operations.
///
/// Infrastructure setup (config, opening the database) reports through
/// `color_eyre` instead; this enum only covers what a read can fail with.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
  /// Offline and nothing cached for the key, fresh or stale.
  #[error("no internet connection and no cached data available for {key}")]
  NoCachedData { key: String },

  /// The API does not know the requested resource.
  #[error("not found: {path}")]
  NotFound { path: String },

  /// Rate limit exceeded.
  #[error("rate limited: retry after {retry_after:?}")]
  RateLimited { retry_after: Option<Duration> },

  /// Non-success status not covered above.
  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },

  /// Transport failure: DNS, connect, timeout, broken body.
  #[error("network error: {message}")]
  Network { message: String },

  /// The response body did not match the expected shape.
  #[error("invalid response: {message}")]
  Decode { message: String },
}

impl Error {
  /// Whether a retry at the HTTP layer may succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Network { .. } | Self::RateLimited { .. } => true,
      Self::Http { status, .. } => *status >= 500,
      Self::NoCachedData { .. } | Self::NotFound { .. } | Self::Decode { .. } => false,
    }
  }

  /// Whether this is the terminal offline-without-cache case.
  pub fn is_offline(&self) -> bool {
    matches!(self, Self::NoCachedData { .. })
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      Self::Decode {
        message: e.to_string(),
      }
    } else {
      Self::Network {
        message: e.to_string(),
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_retryable_classification() {
    assert!(Error::Network {
      message: "timeout".into()
    }
    .is_retryable());
    assert!(Error::RateLimited { retry_after: None }.is_retryable());
    assert!(Error::Http {
      status: 503,
      message: "unavailable".into()
    }
    .is_retryable());

    assert!(!Error::Http {
      status: 400,
      message: "bad".into()
    }
    .is_retryable());
    assert!(!Error::NotFound {
      path: "/coins/nope".into()
    }
    .is_retryable());
    assert!(!Error::NoCachedData { key: "k".into() }.is_retryable());
  }

  #[test]
  fn test_offline_message() {
    let err = Error::NoCachedData {
      key: "coins_page_1_per_50".into(),
    };
    assert!(err.is_offline());
    assert_eq!(
      err.to_string(),
      "no internet connection and no cached data available for coins_page_1_per_50"
    );
  }
}
