use serde::{Deserialize, Serialize};

use super::numeric;

/// A single candlestick, timestamps in epoch milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Open interest history entry as served by `/futures/data/openInterestHist`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInterestPoint {
    pub symbol: String,
    #[serde(
        rename = "sumOpenInterest",
        deserialize_with = "numeric::de_open_interest"
    )]
    pub open_interest: f64,
    pub timestamp: i64,
}

/// Global long/short account ratio entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioPoint {
    pub symbol: String,
    #[serde(deserialize_with = "numeric::de_long_short_ratio")]
    pub long_short_ratio: f64,
    #[serde(deserialize_with = "numeric::de_long_account")]
    pub long_account: f64,
    #[serde(deserialize_with = "numeric::de_short_account")]
    pub short_account: f64,
    pub timestamp: i64,
}

/// Everything the detectors need for one symbol.
///
/// All three series are ordered oldest-first and cover the same lookback
/// window; their lengths may still differ when the exchange returns less data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub open_interest: Vec<OpenInterestPoint>,
    pub ratios: Vec<RatioPoint>,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// First point whose symbol differs from the snapshot's, if any
    pub fn mismatched_symbol(&self) -> Option<&str> {
        self.candles
            .iter()
            .map(|c| c.symbol.as_str())
            .chain(self.open_interest.iter().map(|p| p.symbol.as_str()))
            .chain(self.ratios.iter().map(|p| p.symbol.as_str()))
            .find(|s| *s != self.symbol)
    }
}
