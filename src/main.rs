use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use color_eyre::Result;

use coinwatch::cache::{CacheResult, CacheSource};
use coinwatch::coingecko::{CachedCoinClient, DEFAULT_CHART_DAYS, DEFAULT_PAGE, DEFAULT_PER_PAGE};
use coinwatch::config::Config;
use coinwatch::connectivity::FixedConnectivity;
use coinwatch::favorites::Favorites;
use coinwatch::logging;
use coinwatch::store::{KvStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "coinwatch")]
#[command(about = "Cryptocurrency prices that keep working offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/coinwatch/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Skip the network and answer from the cache only
  #[arg(long)]
  offline: bool,

  /// Log to stderr instead of the log file
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List coins by market cap
  Coins {
    #[arg(long, default_value_t = DEFAULT_PAGE)]
    page: u32,
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: u32,
  },
  /// Show details and recent price range of a coin
  Coin {
    /// CoinGecko id, e.g. "bitcoin"
    id: String,
    #[arg(long, default_value_t = DEFAULT_CHART_DAYS)]
    days: u32,
  },
  /// Show the price history of a coin
  Chart {
    id: String,
    #[arg(long, default_value_t = DEFAULT_CHART_DAYS)]
    days: u32,
  },
  /// Search coins by name or symbol
  Search { query: String },
  /// Inspect or clear the local cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
  /// Manage favorite coins
  Favorites {
    #[command(subcommand)]
    action: FavoritesAction,
  },
  /// Pin a coin, or show the pinned coin when no id is given
  Pin { id: Option<String> },
  /// Clear the pinned coin
  Unpin,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Show entry count and age range
  Info,
  /// Remove every cached entry
  Clear,
}

#[derive(Subcommand, Debug)]
enum FavoritesAction {
  /// List favorites in the order they were added
  List,
  Add { id: String },
  Remove { id: String },
  /// Add if missing, remove if present
  Toggle { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = if args.verbose {
    logging::init_stderr()?;
    None
  } else {
    Some(logging::init(&logging::default_log_dir()?)?)
  };

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let store: Arc<dyn KvStore> = match &config.cache.path {
    Some(path) => Arc::new(SqliteStore::open_at(path)?),
    None => Arc::new(SqliteStore::open()?),
  };
  let favorites = Favorites::new(store.clone());

  let client = if args.offline {
    CachedCoinClient::with_connectivity(&config, store, Arc::new(FixedConnectivity::offline()))?
  } else {
    CachedCoinClient::new(&config, store)?
  };

  match args.command {
    Command::Coins { page, per_page } => {
      let result = client.get_coins(page, per_page).await?;
      print_origin(&result);
      for coin in &result.data {
        println!(
          "{:>4}  {:<8} {:<24} {:>16} {:>9}",
          coin
            .market_cap_rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".into()),
          coin.symbol.to_uppercase(),
          coin.name,
          format_usd(coin.current_price),
          format_pct(coin.price_change_percentage_24h),
        );
      }
      settle(result).await;
    }
    Command::Coin { id, days } => {
      let (details, chart) = futures::future::join(
        client.get_coin_details(&id),
        client.get_market_chart(&id, days),
      )
      .await;
      let (details, chart) = join_settled(details, chart).await?;
      print_origin(&details);

      let market = &details.data.market_data;
      println!(
        "{} ({})",
        details.data.name,
        details.data.symbol.to_uppercase()
      );
      println!("  price       {}", format_usd(market.price_in("usd")));
      println!("  24h change  {}", format_pct(market.price_change_percentage_24h));
      println!("  7d change   {}", format_pct(market.price_change_percentage_7d));
      println!("  30d change  {}", format_pct(market.price_change_percentage_30d));

      let prices = chart.data.prices.iter().map(|(_, p)| *p);
      let low = prices.clone().fold(f64::INFINITY, f64::min);
      let high = prices.fold(f64::NEG_INFINITY, f64::max);
      if low.is_finite() && high.is_finite() {
        println!(
          "  {}d range    {} - {}",
          days,
          format_usd(Some(low)),
          format_usd(Some(high))
        );
      }
      settle(details).await;
      settle(chart).await;
    }
    Command::Chart { id, days } => {
      let result = client.get_market_chart(&id, days).await?;
      print_origin(&result);
      for (timestamp, price) in &result.data.prices {
        let when = DateTime::<Utc>::from_timestamp_millis(*timestamp as i64);
        println!("{}  {:>16}", format_time(when), format_usd(Some(*price)));
      }
      settle(result).await;
    }
    Command::Search { query } => {
      let result = client.search_coins(&query).await?;
      print_origin(&result);
      for hit in &result.data {
        println!(
          "{:<24} {:<8} {}",
          hit.id,
          hit.symbol,
          hit
            .market_cap_rank
            .map(|r| format!("#{}", r))
            .unwrap_or_default()
        );
      }
      settle(result).await;
    }
    Command::Cache { action } => match action {
      CacheAction::Info => {
        let info = client.cache_info().await;
        println!("entries  {}", info.count);
        println!("oldest   {}", format_time(info.oldest));
        println!("newest   {}", format_time(info.newest));
      }
      CacheAction::Clear => {
        client.clear_cache().await;
        println!("cache cleared");
      }
    },
    Command::Favorites { action } => match action {
      FavoritesAction::List => {
        let pinned = favorites.pinned().await?;
        for id in favorites.list().await? {
          let marker = if pinned.as_deref() == Some(id.as_str()) { "*" } else { " " };
          println!("{} {}", marker, id);
        }
      }
      FavoritesAction::Add { id } => {
        if !favorites.add(&id).await? {
          println!("{} is already a favorite", id);
        }
      }
      FavoritesAction::Remove { id } => {
        if !favorites.remove(&id).await? {
          println!("{} is not a favorite", id);
        }
      }
      FavoritesAction::Toggle { id } => {
        let now = if favorites.toggle(&id).await? { "added" } else { "removed" };
        println!("{} {}", id, now);
      }
    },
    Command::Pin { id: Some(id) } => favorites.pin(&id).await?,
    Command::Pin { id: None } => match favorites.pinned().await? {
      Some(id) => println!("{}", id),
      None => println!("no coin pinned"),
    },
    Command::Unpin => favorites.unpin().await?,
  }

  Ok(())
}

/// Let a background refresh finish so the next run sees fresh data.
async fn settle<T>(result: CacheResult<T>) {
  if let Some(revalidation) = result.revalidation {
    if let Err(e) = revalidation.await {
      tracing::warn!(error = %e, "background refresh task panicked");
    }
  }
}

/// Pair up two concurrent reads. On failure the successful one is still
/// settled before the error propagates.
async fn join_settled<A, B>(
  a: coinwatch::Result<CacheResult<A>>,
  b: coinwatch::Result<CacheResult<B>>,
) -> coinwatch::Result<(CacheResult<A>, CacheResult<B>)> {
  match (a, b) {
    (Ok(a), Ok(b)) => Ok((a, b)),
    (Ok(a), Err(e)) => {
      settle(a).await;
      Err(e)
    }
    (Err(e), Ok(b)) => {
      settle(b).await;
      Err(e)
    }
    (Err(e), Err(_)) => Err(e),
  }
}

fn print_origin<T>(result: &CacheResult<T>) {
  let when = format_time(result.stored_at);
  match result.source {
    CacheSource::Network => {}
    CacheSource::CacheFresh => eprintln!("(cached {}, refreshing)", when),
    CacheSource::Offline if result.is_stale() => eprintln!("(offline, stale data from {})", when),
    CacheSource::Offline => eprintln!("(offline, cached {})", when),
  }
}

fn format_usd(value: Option<f64>) -> String {
  match value {
    Some(v) if v >= 1.0 => format!("${:.2}", v),
    Some(v) => format!("${:.6}", v),
    None => "-".to_string(),
  }
}

fn format_pct(value: Option<f64>) -> String {
  value
    .map(|v| format!("{:+.2}%", v))
    .unwrap_or_else(|| "-".to_string())
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
  time
    .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_else(|| "-".to_string())
}
