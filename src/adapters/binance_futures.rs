//! Binance USDⓈ-M futures REST client
//!
//! Fetches the three series the detectors consume: klines, open interest
//! history and the global long/short account ratio.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{parse_lenient, Candle, MarketSnapshot, OpenInterestPoint, RatioPoint};
use crate::error::{Result, SentinelError};
use crate::services::MarketDataSource;

pub const BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";

/// Binance caps every one of these endpoints at 500 rows
pub const MAX_LIMIT: usize = 500;

pub struct BinanceFuturesClient {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceFuturesClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SentinelError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch klines, oldest first
    pub async fn fetch_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol,
            interval,
            limit.min(MAX_LIMIT)
        );
        let rows: Vec<Vec<serde_json::Value>> = self.get_json(&url, "klines").await?;

        let candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| parse_kline_row(symbol, row))
            .collect();
        if candles.len() < rows.len() {
            warn!(
                symbol,
                dropped = rows.len() - candles.len(),
                "Dropped short kline rows"
            );
        }
        debug!("Fetched {} klines for {}", candles.len(), symbol);
        Ok(candles)
    }

    pub async fn fetch_open_interest(
        &self,
        symbol: &str,
        period: &str,
        limit: usize,
    ) -> Result<Vec<OpenInterestPoint>> {
        let url = format!(
            "{}/futures/data/openInterestHist?symbol={}&period={}&limit={}",
            self.base_url,
            symbol,
            period,
            limit.min(MAX_LIMIT)
        );
        let mut points: Vec<OpenInterestPoint> = self.get_json(&url, "open interest").await?;
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }

    pub async fn fetch_long_short_ratio(
        &self,
        symbol: &str,
        period: &str,
        limit: usize,
    ) -> Result<Vec<RatioPoint>> {
        let url = format!(
            "{}/futures/data/globalLongShortAccountRatio?symbol={}&period={}&limit={}",
            self.base_url,
            symbol,
            period,
            limit.min(MAX_LIMIT)
        );
        let mut points: Vec<RatioPoint> = self.get_json(&url, "long/short ratio").await?;
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!("Fetching {}: {}", what, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SentinelError::MarketDataUnavailable(format!("{} request failed: {}", what, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SentinelError::MarketDataUnavailable(format!(
                "{} API error: {} - {}",
                what, status, body
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            SentinelError::InvalidMarketData(format!("{} parse error: {}, body: {}", what, e, body))
        })
    }
}

#[async_trait]
impl MarketDataSource for BinanceFuturesClient {
    async fn fetch(&self, symbol: &str, interval: &str, lookback: usize) -> Result<MarketSnapshot> {
        let mut snapshot = MarketSnapshot::new(symbol);
        snapshot.candles = self.fetch_klines(symbol, interval, lookback).await?;
        snapshot.open_interest = self.fetch_open_interest(symbol, interval, lookback).await?;
        snapshot.ratios = self.fetch_long_short_ratio(symbol, interval, lookback).await?;

        if let Some(other) = snapshot.mismatched_symbol() {
            return Err(SentinelError::InvalidMarketData(format!(
                "requested {} but payload contains {}",
                symbol, other
            )));
        }
        Ok(snapshot)
    }
}

/// Parse one kline row: `[openTime, open, high, low, close, volume, ...]`.
///
/// Rows that are too short or lack an open time are dropped; malformed
/// price/volume strings fall back to zero.
fn parse_kline_row(symbol: &str, row: &[serde_json::Value]) -> Option<Candle> {
    if row.len() < 6 {
        return None;
    }
    let field = |idx: usize, name: &'static str| match &row[idx] {
        serde_json::Value::String(raw) => parse_lenient(raw, name),
        serde_json::Value::Number(n) => n.as_f64().unwrap_or_else(|| parse_lenient("", name)),
        _ => parse_lenient("", name),
    };

    Some(Candle {
        symbol: symbol.to_string(),
        timestamp: row[0].as_i64()?,
        open: field(1, "open"),
        high: field(2, "high"),
        low: field(3, "low"),
        close: field(4, "close"),
        volume: field(5, "volume"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_kline_row() {
        let row = json!([
            1700000000000i64,
            "37000.10",
            "37100.00",
            "36950.50",
            "37050.25",
            "1234.567",
            1700000899999i64,
            "45678901.23",
            15000,
            "600.1",
            "22222222.2",
            "0"
        ]);
        let row = row.as_array().unwrap();
        let candle = parse_kline_row("BTCUSDT", row).unwrap();
        assert_eq!(candle.symbol, "BTCUSDT");
        assert_eq!(candle.timestamp, 1_700_000_000_000);
        assert_eq!(candle.open, 37000.10);
        assert_eq!(candle.close, 37050.25);
        assert_eq!(candle.volume, 1234.567);
    }

    #[test]
    fn test_parse_kline_row_lenient_fields() {
        let row = json!([1700000000000i64, "1.0", "bad", "0.5", "0.9", null]);
        let candle = parse_kline_row("BTCUSDT", row.as_array().unwrap()).unwrap();
        assert_eq!(candle.high, 0.0);
        assert_eq!(candle.volume, 0.0);
        assert_eq!(candle.low, 0.5);
    }

    #[test]
    fn test_parse_kline_row_rejects_short_rows() {
        let row = json!([1700000000000i64, "1.0", "1.0"]);
        assert!(parse_kline_row("BTCUSDT", row.as_array().unwrap()).is_none());

        let row = json!(["not-a-time", "1", "1", "1", "1", "1"]);
        assert!(parse_kline_row("BTCUSDT", row.as_array().unwrap()).is_none());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client =
            BinanceFuturesClient::new("https://fapi.binance.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, BINANCE_FUTURES_URL);
    }
}
