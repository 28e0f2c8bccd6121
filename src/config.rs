use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  /// Per-request timeout
  pub timeout_secs: u64,
  /// Retries for transient failures (network, 429, 5xx)
  pub retries: u32,
  /// Demo API key; usually supplied through the environment instead
  pub api_key: Option<String>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout_secs: 10,
      retries: 1,
      api_key: None,
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// When false nothing is persisted and every read goes to the network
  pub enabled: bool,
  /// Age after which an entry stops being preferred over a network fetch
  pub ttl_secs: i64,
  /// Database location (defaults to the platform data dir)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ttl_secs: crate::cache::DEFAULT_TTL_SECS,
      path: None,
    }
  }
}

impl CacheConfig {
  /// Entry TTL; fails for negative or out-of-range values.
  pub fn ttl(&self) -> Result<chrono::Duration> {
    if self.ttl_secs < 0 {
      return Err(eyre!("cache.ttl_secs must not be negative, got {}", self.ttl_secs));
    }
    chrono::Duration::try_seconds(self.ttl_secs)
      .ok_or_else(|| eyre!("cache.ttl_secs is out of range: {}", self.ttl_secs))
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
  /// Timeout of the reachability probe
  pub probe_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self {
      probe_timeout_secs: 3,
    }
  }
}

impl ConnectivityConfig {
  pub fn probe_timeout(&self) -> Duration {
    Duration::from_secs(self.probe_timeout_secs)
  }
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./coinwatch.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/coinwatch/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.apply_env();
    config.validate()?;

    Ok(config)
  }

  /// Reject values that would only fail later, at first use.
  fn validate(&self) -> Result<()> {
    self.cache.ttl()?;
    Ok(())
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("coinwatch.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("coinwatch").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  fn apply_env(&mut self) {
    if let Some(key) = Self::get_api_key() {
      self.api.api_key = Some(key);
    }
    if let Ok(url) = std::env::var("COINGECKO_BASE_URL") {
      if !url.is_empty() {
        self.api.base_url = url;
      }
    }
  }

  /// Get the CoinGecko API key from environment variables.
  ///
  /// Checks COINWATCH_API_KEY first, then COINGECKO_API_KEY as fallback.
  /// A missing key only means the lower rate-limit tier.
  pub fn get_api_key() -> Option<String> {
    std::env::var("COINWATCH_API_KEY")
      .or_else(|_| std::env::var("COINGECKO_API_KEY"))
      .ok()
      .filter(|k| !k.is_empty())
  }
}
