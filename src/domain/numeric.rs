//! Lenient decimal parsing for upstream string fields.
//!
//! Exchange payloads carry most numbers as strings. A malformed value becomes
//! `0.0` instead of failing the whole series; every such fallback is logged and
//! counted so data-quality problems stay visible.

use serde::{Deserialize, Deserializer};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

static LENIENT_FALLBACKS: AtomicU64 = AtomicU64::new(0);

/// Parse `raw` as `f64`, falling back to `0.0` on malformed input.
pub fn parse_lenient(raw: &str, field: &'static str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            LENIENT_FALLBACKS.fetch_add(1, Ordering::Relaxed);
            warn!(field, raw, "malformed numeric field, defaulting to 0");
            0.0
        }
    }
}

/// Number of fields that fell back to zero since process start
pub fn lenient_fallback_count() -> u64 {
    LENIENT_FALLBACKS.load(Ordering::Relaxed)
}

/// Accepts either a JSON string or a JSON number
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Text(String),
    Number(f64),
}

fn lenient_field<'de, D>(deserializer: D, field: &'static str) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawNumber::deserialize(deserializer) {
        Ok(RawNumber::Text(raw)) => parse_lenient(&raw, field),
        Ok(RawNumber::Number(value)) => value,
        Err(_) => parse_lenient("", field),
    })
}

pub(crate) fn de_open_interest<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    lenient_field(d, "sumOpenInterest")
}

pub(crate) fn de_long_short_ratio<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    lenient_field(d, "longShortRatio")
}

pub(crate) fn de_long_account<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    lenient_field(d, "longAccount")
}

pub(crate) fn de_short_account<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    lenient_field(d, "shortAccount")
}
