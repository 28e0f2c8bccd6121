//! Durable key-value storage backends.
//!
//! The cache never touches a concrete database directly. It is handed a
//! [`KvStore`] at construction time, so the same cache logic runs against
//! SQLite on disk, an in-memory map in tests, or nothing at all when caching
//! is disabled.

mod memory;
mod sqlite;

use async_trait::async_trait;
use color_eyre::Result;

pub use memory::{MemoryStore, NoopStore};
pub use sqlite::SqliteStore;

/// Async map from string keys to opaque bytes.
#[async_trait]
pub trait KvStore: Send + Sync {
  /// Read the value stored under `key`, if any.
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

  /// Store `value` under `key`, replacing any previous value.
  async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

  /// Remove `key`. Removing a missing key is not an error.
  async fn remove(&self, key: &str) -> Result<()>;

  /// List every key currently stored.
  async fn keys(&self) -> Result<Vec<String>>;

  /// Remove several keys at once.
  async fn remove_many(&self, keys: &[String]) -> Result<()> {
    for key in keys {
      self.remove(key).await?;
    }
    Ok(())
  }
}
