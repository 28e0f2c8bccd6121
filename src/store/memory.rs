use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};

use super::KvStore;

/// In-process store backed by a `HashMap`.
///
/// Nothing survives the process. Tests inject it in place of [`SqliteStore`](super::SqliteStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().map(|e| e.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl KvStore for MemoryStore {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), value.to_vec());
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.remove(key);
    Ok(())
  }

  async fn keys(&self) -> Result<Vec<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.keys().cloned().collect())
  }
}

/// Store that doesn't keep anything.
/// Used when caching is disabled - every read misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl KvStore for NoopStore {
  async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
    Ok(None) // Always miss
  }

  async fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
    Ok(()) // Discard
  }

  async fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  async fn keys(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_memory_store_roundtrip() {
    let store = MemoryStore::new();
    store.set("a", b"1").await.unwrap();

    assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get("b").await.unwrap(), None);
    assert_eq!(store.len(), 1);
  }

  #[tokio::test]
  async fn test_memory_store_remove_many() {
    let store = MemoryStore::new();
    store.set("a", b"1").await.unwrap();
    store.set("b", b"2").await.unwrap();
    store.set("c", b"3").await.unwrap();

    store
      .remove_many(&["a".to_string(), "c".to_string(), "missing".to_string()])
      .await
      .unwrap();

    assert_eq!(store.keys().await.unwrap(), vec!["b".to_string()]);
  }

  #[tokio::test]
  async fn test_noop_store_always_misses() {
    let store = NoopStore;
    store.set("a", b"1").await.unwrap();

    assert_eq!(store.get("a").await.unwrap(), None);
    assert!(store.keys().await.unwrap().is_empty());
  }
}
