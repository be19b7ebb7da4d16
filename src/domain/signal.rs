use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Family of detector that produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Volume,
    OpenInterest,
    LongShortRatio,
    /// Reserved for multi-detector fusion; nothing produces it yet
    Composite,
}

impl SignalKind {
    /// Stable tag used in suppression keys and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Volume => "volume",
            SignalKind::OpenInterest => "open_interest",
            SignalKind::LongShortRatio => "long_short_ratio",
            SignalKind::Composite => "composite",
        }
    }

    /// Human-readable label for notifications
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::Volume => "Volume Anomaly",
            SignalKind::OpenInterest => "Open Interest Shift",
            SignalKind::LongShortRatio => "Long/Short Extreme",
            SignalKind::Composite => "Composite Signal",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a consecutive open-interest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunDirection {
    Rise,
    Fall,
}

impl RunDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunDirection::Rise => "rise",
            RunDirection::Fall => "fall",
        }
    }
}

impl std::fmt::Display for RunDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which open-interest pattern fired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum OpenInterestPattern {
    /// Latest value against the value one lookback window earlier
    Change24h { change_percent_24h: f64 },
    /// Every delta over the last few periods points the same way
    Run {
        consecutive_periods: usize,
        direction: RunDirection,
    },
    /// Latest value against the immediately preceding one
    Spike { change_percent_1p: f64 },
}

/// Detector-specific numbers attached to a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalMeta {
    Volume {
        z_score: f64,
        threshold: f64,
        mean_volume: f64,
    },
    OpenInterest(OpenInterestPattern),
    LongShortRatio {
        z_score: f64,
        threshold: f64,
        ls_ratio: f64,
    },
}

/// An anomaly ready to be deduplicated and delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub kind: SignalKind,
    /// Timestamp of the data point that triggered the signal
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub meta: SignalMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
}

impl Signal {
    pub fn new(
        symbol: impl Into<String>,
        kind: SignalKind,
        timestamp_ms: i64,
        description: impl Into<String>,
        meta: SignalMeta,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            timestamp: DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default(),
            description: description.into(),
            meta,
            ai_analysis: None,
        }
    }

    /// Key under which a delivered signal is suppressed, e.g. `BTCUSDT:volume`
    pub fn suppression_key(&self) -> String {
        format!("{}:{}", self.symbol, self.kind)
    }

    /// Attach AI commentary
    pub fn with_analysis(mut self, analysis: String) -> Self {
        self.ai_analysis = Some(analysis);
        self
    }
}
