//! Seams between the detection core and its I/O collaborators

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{MarketSnapshot, Signal};
use crate::error::Result;

/// Source of per-symbol market history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch `lookback` most recent intervals, oldest first
    async fn fetch(&self, symbol: &str, interval: &str, lookback: usize) -> Result<MarketSnapshot>;
}

/// TTL-bounded key store used to suppress repeat notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SuppressionStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool>;

    async fn put(&self, key: &str, ttl: Duration) -> Result<()>;
}

/// Delivery channel for signals
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalNotifier: Send + Sync {
    async fn send(&self, signal: &Signal) -> Result<()>;
}

/// Produces free-text commentary for a signal
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalAnalyst: Send + Sync {
    async fn analyze(&self, signal: &Signal, context: &str) -> Result<String>;
}
