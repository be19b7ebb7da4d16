//! Per-symbol orchestration: run the detectors and render the context digest

use std::fmt;
use tracing::warn;

use super::detectors;
use super::stats;
use crate::domain::{MarketSnapshot, Signal};

const RSI_PERIOD: usize = 14;
const EMA_FAST: usize = 12;
const EMA_SLOW: usize = 26;
const RECENT_CANDLES: usize = 5;

/// Run every detector over a snapshot.
///
/// Order is volume, open interest, then long/short ratio.
pub fn analyze(snapshot: &MarketSnapshot) -> Vec<Signal> {
    let mut signals = Vec::new();
    signals.extend(detectors::detect_volume(&snapshot.candles));
    signals.extend(detectors::detect_open_interest(&snapshot.open_interest));
    signals.extend(detectors::detect_long_short_ratio(&snapshot.ratios));
    signals
}

/// Markdown digest of the snapshot used as AI prompt context
pub fn build_context(snapshot: &MarketSnapshot) -> String {
    let mut out = String::new();
    if write_context(&mut out, snapshot).is_err() {
        warn!(symbol = %snapshot.symbol, "context digest truncated");
    }
    out
}

fn write_context(out: &mut impl fmt::Write, snapshot: &MarketSnapshot) -> fmt::Result {
    let closes = snapshot.closes();
    let na = || "n/a".to_string();

    let latest_close = snapshot
        .candles
        .last()
        .map_or_else(na, |c| format!("{:.4}", c.close));
    let latest_oi = snapshot
        .open_interest
        .last()
        .map_or_else(na, |p| format!("{:.2}", p.open_interest));
    let latest_ratio = snapshot
        .ratios
        .last()
        .map_or_else(na, |p| format!("{:.4}", p.long_short_ratio));

    writeln!(out, "### Key Indicators")?;
    writeln!(out, "- **Latest close:** {}", latest_close)?;
    writeln!(out, "- **RSI ({}):** {:.2}", RSI_PERIOD, stats::rsi(&closes, RSI_PERIOD))?;
    writeln!(
        out,
        "- **EMA ({}/{}):** {:.4} / {:.4}",
        EMA_FAST,
        EMA_SLOW,
        stats::ema(&closes, EMA_FAST),
        stats::ema(&closes, EMA_SLOW)
    )?;
    writeln!(out, "- **Latest open interest:** {}", latest_oi)?;
    writeln!(out, "- **Latest long/short ratio:** {}", latest_ratio)?;
    writeln!(out)?;

    writeln!(out, "### Recent Candles (OHLCV)")?;
    let start = snapshot.candles.len().saturating_sub(RECENT_CANDLES);
    for c in &snapshot.candles[start..] {
        writeln!(
            out,
            "  - T: {}, O: {:.2}, H: {:.2}, L: {:.2}, C: {:.2}, V: {:.2}",
            c.timestamp, c.open, c.high, c.low, c.close, c.volume
        )?;
    }
    Ok(())
}
