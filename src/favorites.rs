//! User-curated coin lists persisted next to the cache.
//!
//! These live under plain keys outside the cache namespace, so clearing the
//! cache leaves them alone.

use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::KvStore;

const FAVORITES_KEY: &str = "favorites";
const PINNED_KEY: &str = "pinned_coin";

/// Favorite coin ids and the single pinned coin.
#[derive(Clone)]
pub struct Favorites {
  store: Arc<dyn KvStore>,
}

impl Favorites {
  pub fn new(store: Arc<dyn KvStore>) -> Self {
    Self { store }
  }

  /// Favorite ids in the order they were added.
  pub async fn list(&self) -> Result<Vec<String>> {
    Ok(self.load(FAVORITES_KEY).await?.unwrap_or_default())
  }

  pub async fn is_favorite(&self, coin_id: &str) -> Result<bool> {
    Ok(self.list().await?.iter().any(|id| id == coin_id))
  }

  /// Add `coin_id`. Returns false if it was already a favorite.
  pub async fn add(&self, coin_id: &str) -> Result<bool> {
    let mut favorites = self.list().await?;
    if favorites.iter().any(|id| id == coin_id) {
      return Ok(false);
    }
    favorites.push(coin_id.to_string());
    self.save(FAVORITES_KEY, &favorites).await?;
    Ok(true)
  }

  /// Remove `coin_id`. Returns false if it was not a favorite.
  pub async fn remove(&self, coin_id: &str) -> Result<bool> {
    let mut favorites = self.list().await?;
    let before = favorites.len();
    favorites.retain(|id| id != coin_id);
    if favorites.len() == before {
      return Ok(false);
    }
    self.save(FAVORITES_KEY, &favorites).await?;
    Ok(true)
  }

  /// Flip membership of `coin_id`; returns whether it is now a favorite.
  pub async fn toggle(&self, coin_id: &str) -> Result<bool> {
    if self.remove(coin_id).await? {
      Ok(false)
    } else {
      self.add(coin_id).await
    }
  }

  pub async fn pinned(&self) -> Result<Option<String>> {
    self.load(PINNED_KEY).await
  }

  /// Pin `coin_id`, replacing any previously pinned coin.
  pub async fn pin(&self, coin_id: &str) -> Result<()> {
    self.save(PINNED_KEY, coin_id).await
  }

  pub async fn unpin(&self) -> Result<()> {
    self.store.remove(PINNED_KEY).await
  }

  async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    match self.store.get(key).await? {
      Some(bytes) => serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| eyre!("Corrupt {} entry: {}", key, e)),
      None => Ok(None),
    }
  }

  async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
    let bytes =
      serde_json::to_vec(value).map_err(|e| eyre!("Failed to encode {}: {}", key, e))?;
    self.store.set(key, &bytes).await
  }
}
