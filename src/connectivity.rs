//! Network reachability signal consumed by the cache layer.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

/// Snapshot of what the platform reports about the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkState {
  /// A network interface is up
  pub is_connected: bool,
  /// Whether the internet is reachable; `None` while unknown
  pub is_internet_reachable: Option<bool>,
}

impl NetworkState {
  pub fn online() -> Self {
    Self {
      is_connected: true,
      is_internet_reachable: Some(true),
    }
  }

  pub fn offline() -> Self {
    Self {
      is_connected: false,
      is_internet_reachable: Some(false),
    }
  }

  /// Connected, and reachability not explicitly reported false.
  ///
  /// Unknown reachability counts as online.
  pub fn is_online(&self) -> bool {
    self.is_connected && self.is_internet_reachable != Some(false)
  }
}

/// Source of the online/offline signal.
#[async_trait]
pub trait Connectivity: Send + Sync {
  async fn is_online(&self) -> bool;
}

/// Connectivity that never changes, e.g. for `--offline`.
#[derive(Debug, Clone, Copy)]
pub struct FixedConnectivity(pub NetworkState);

impl FixedConnectivity {
  pub fn online() -> Self {
    Self(NetworkState::online())
  }

  pub fn offline() -> Self {
    Self(NetworkState::offline())
  }
}

#[async_trait]
impl Connectivity for FixedConnectivity {
  async fn is_online(&self) -> bool {
    self.0.is_online()
  }
}

/// Connectivity fed by a subscription: whoever owns the sender pushes state
/// changes, readers always see the latest value.
#[derive(Debug, Clone)]
pub struct WatchConnectivity {
  rx: watch::Receiver<NetworkState>,
}

impl WatchConnectivity {
  /// Create a connected sender/oracle pair starting at `initial`.
  pub fn channel(initial: NetworkState) -> (watch::Sender<NetworkState>, Self) {
    let (tx, rx) = watch::channel(initial);
    (tx, Self { rx })
  }

  /// Wait until the state changes and return the new value.
  ///
  /// Returns `None` once the sender is gone.
  pub async fn changed(&mut self) -> Option<NetworkState> {
    self.rx.changed().await.ok()?;
    Some(*self.rx.borrow_and_update())
  }
}

#[async_trait]
impl Connectivity for WatchConnectivity {
  async fn is_online(&self) -> bool {
    self.rx.borrow().is_online()
  }
}

/// Connectivity polled by hitting a cheap HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpProbe {
  client: reqwest::Client,
  url: String,
}

impl HttpProbe {
  pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      url: url.into(),
    })
  }

  /// Probe once and translate the outcome into a [`NetworkState`].
  pub async fn probe(&self) -> NetworkState {
    match self.client.head(&self.url).send().await {
      // Any HTTP answer proves the host is reachable
      Ok(_) => NetworkState::online(),
      Err(e) if e.is_connect() => {
        debug!(url = %self.url, error = %e, "connectivity probe could not connect");
        NetworkState::offline()
      }
      Err(e) => {
        debug!(url = %self.url, error = %e, "connectivity probe inconclusive");
        NetworkState {
          is_connected: true,
          is_internet_reachable: None,
        }
      }
    }
  }
}

#[async_trait]
impl Connectivity for HttpProbe {
  async fn is_online(&self) -> bool {
    self.probe().await.is_online()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_online_rule() {
    let unknown = NetworkState {
      is_connected: true,
      is_internet_reachable: None,
    };
    let unreachable = NetworkState {
      is_connected: true,
      is_internet_reachable: Some(false),
    };
    let disconnected = NetworkState {
      is_connected: false,
      is_internet_reachable: None,
    };

    assert!(NetworkState::online().is_online());
    assert!(unknown.is_online());
    assert!(!unreachable.is_online());
    assert!(!disconnected.is_online());
    assert!(!NetworkState::offline().is_online());
  }

  #[tokio::test]
  async fn test_watch_connectivity_follows_sender() {
    let (tx, oracle) = WatchConnectivity::channel(NetworkState::online());
    assert!(oracle.is_online().await);

    tx.send(NetworkState::offline()).unwrap();
    assert!(!oracle.is_online().await);
  }

  #[tokio::test]
  async fn test_watch_connectivity_changed() {
    let (tx, mut oracle) = WatchConnectivity::channel(NetworkState::online());

    tokio::spawn(async move {
      tx.send(NetworkState::offline()).unwrap();
    });

    assert_eq!(oracle.changed().await, Some(NetworkState::offline()));
    assert_eq!(oracle.changed().await, None);
  }

  #[tokio::test]
  async fn test_http_probe_reachable() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("HEAD"))
      .respond_with(wiremock::ResponseTemplate::new(200))
      .mount(&server)
      .await;

    let probe = HttpProbe::new(format!("{}/ping", server.uri()), Duration::from_secs(2)).unwrap();
    assert!(probe.is_online().await);
  }

  #[tokio::test]
  async fn test_unanswered_ping_counts_as_online() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("HEAD"))
      .respond_with(wiremock::ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
      .mount(&server)
      .await;

    let probe =
      HttpProbe::new(format!("{}/ping", server.uri()), Duration::from_millis(50)).unwrap();

    let state = probe.probe().await;
    assert!(state.is_connected);
    assert_eq!(state.is_internet_reachable, None);
    assert!(probe.is_online().await);
  }

  #[tokio::test]
  async fn test_http_probe_connection_refused() {
    // Grab a free port, then release it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/ping", listener.local_addr().unwrap());
    drop(listener);

    let probe = HttpProbe::new(url, Duration::from_secs(2)).unwrap();
    assert!(!probe.is_online().await);
  }
}
