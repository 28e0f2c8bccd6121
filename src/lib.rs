//! Offline-resilient data layer for a cryptocurrency price tracker.
//!
//! Reads go through a stale-while-revalidate cache in front of the
//! rate-limited CoinGecko API: cached data is returned immediately and
//! refreshed in the background, stale data is served while offline, and only
//! a cold cache without network is an error.

pub mod cache;
pub mod coingecko;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod favorites;
pub mod logging;
pub mod store;

pub use error::{Error, Result};
