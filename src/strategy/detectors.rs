//! Anomaly detectors over a symbol's candle, open-interest and ratio series.
//!
//! Detectors are pure: they never fetch data or consult the suppression store.
//! Short series produce no signal.

use tracing::debug;

use super::stats;
use crate::domain::{
    Candle, OpenInterestPattern, OpenInterestPoint, RatioPoint, RunDirection, Signal, SignalKind,
    SignalMeta,
};

/// |Z| above which volume and ratio readings are anomalous
pub const Z_SCORE_THRESHOLD: f64 = 2.0;

/// Points in one day of 15m history
pub const OI_LOOKBACK_POINTS: usize = 96;
/// Percent change over the lookback window that counts as a shift
pub const OI_CHANGE_24H_THRESHOLD_PCT: f64 = 10.0;
/// Deltas that must all share a sign to count as a run
pub const OI_RUN_PERIODS: usize = 4;
/// Percent change between the last two points that counts as a spike
pub const OI_SPIKE_THRESHOLD_PCT: f64 = 3.5;

/// Volume Z-score detector
pub fn detect_volume(candles: &[Candle]) -> Option<Signal> {
    let last = candles.last()?;
    if candles.len() < 2 {
        return None;
    }

    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let z_score = stats::z_score(&volumes);
    if z_score.abs() <= Z_SCORE_THRESHOLD {
        return None;
    }

    debug!(symbol = %last.symbol, z_score, "volume anomaly");
    Some(Signal::new(
        &last.symbol,
        SignalKind::Volume,
        last.timestamp,
        format!(
            "Volume Z-Score: {:.2} (threshold: {:.1})",
            z_score, Z_SCORE_THRESHOLD
        ),
        SignalMeta::Volume {
            z_score,
            threshold: Z_SCORE_THRESHOLD,
            mean_volume: stats::mean(&volumes),
        },
    ))
}

/// Open-interest detector.
///
/// Three independent patterns, each gated on its own minimum length:
/// change over the lookback window, a run of same-signed deltas, and a
/// single-period spike. Any combination may fire.
pub fn detect_open_interest(points: &[OpenInterestPoint]) -> Vec<Signal> {
    let Some(last) = points.last() else {
        return Vec::new();
    };
    let values: Vec<f64> = points.iter().map(|p| p.open_interest).collect();
    let latest = last.open_interest;
    let mut signals = Vec::new();

    let make = |description: String, pattern: OpenInterestPattern| {
        Signal::new(
            &last.symbol,
            SignalKind::OpenInterest,
            last.timestamp,
            description,
            SignalMeta::OpenInterest(pattern),
        )
    };

    if values.len() >= OI_LOOKBACK_POINTS {
        let reference = values[values.len() - OI_LOOKBACK_POINTS];
        if let Some(change) = percent_change(reference, latest) {
            if change.abs() > OI_CHANGE_24H_THRESHOLD_PCT {
                signals.push(make(
                    format!(
                        "24h open interest change: {:.2}% (threshold: {}%)",
                        change, OI_CHANGE_24H_THRESHOLD_PCT
                    ),
                    OpenInterestPattern::Change24h {
                        change_percent_24h: change,
                    },
                ));
            }
        }
    }

    if let Some(direction) = run_direction(&values) {
        let verb = match direction {
            RunDirection::Rise => "rose",
            RunDirection::Fall => "fell",
        };
        signals.push(make(
            format!(
                "Open interest {} for {} consecutive periods",
                verb, OI_RUN_PERIODS
            ),
            OpenInterestPattern::Run {
                consecutive_periods: OI_RUN_PERIODS,
                direction,
            },
        ));
    }

    if values.len() >= 2 {
        let previous = values[values.len() - 2];
        if let Some(change) = percent_change(previous, latest) {
            if change.abs() > OI_SPIKE_THRESHOLD_PCT {
                signals.push(make(
                    format!(
                        "Single-period open interest change: {:.2}% (threshold: {}%)",
                        change, OI_SPIKE_THRESHOLD_PCT
                    ),
                    OpenInterestPattern::Spike {
                        change_percent_1p: change,
                    },
                ));
            }
        }
    }

    if !signals.is_empty() {
        debug!(symbol = %last.symbol, count = signals.len(), "open interest patterns fired");
    }
    signals
}

/// Long/short account ratio Z-score detector
pub fn detect_long_short_ratio(points: &[RatioPoint]) -> Option<Signal> {
    let last = points.last()?;
    if points.len() < 2 {
        return None;
    }

    let ratios: Vec<f64> = points.iter().map(|p| p.long_short_ratio).collect();
    let z_score = stats::z_score(&ratios);
    if z_score.abs() <= Z_SCORE_THRESHOLD {
        return None;
    }

    debug!(symbol = %last.symbol, z_score, "long/short ratio extreme");
    Some(Signal::new(
        &last.symbol,
        SignalKind::LongShortRatio,
        last.timestamp,
        format!(
            "Long/short account ratio Z-Score: {:.2} (threshold: {:.1}), sentiment may be extreme",
            z_score, Z_SCORE_THRESHOLD
        ),
        SignalMeta::LongShortRatio {
            z_score,
            threshold: Z_SCORE_THRESHOLD,
            ls_ratio: last.long_short_ratio,
        },
    ))
}

/// Percent change from `from` to `to`; `None` when `from` is zero
fn percent_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        return None;
    }
    Some((to - from) / from * 100.0)
}

fn run_direction(values: &[f64]) -> Option<RunDirection> {
    if values.len() < OI_RUN_PERIODS + 1 {
        return None;
    }
    let tail = &values[values.len() - (OI_RUN_PERIODS + 1)..];
    let deltas = || tail.windows(2).map(|w| w[1] - w[0]);

    if deltas().all(|d| d > 0.0) {
        Some(RunDirection::Rise)
    } else if deltas().all(|d| d < 0.0) {
        Some(RunDirection::Fall)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(volumes: &[f64]) -> Vec<Candle> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &volume)| Candle {
                symbol: "BTCUSDT".to_string(),
                timestamp: 1_700_000_000_000 + i as i64 * 900_000,
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume,
            })
            .collect()
    }

    fn oi_points(values: &[f64]) -> Vec<OpenInterestPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &open_interest)| OpenInterestPoint {
                symbol: "BTCUSDT".to_string(),
                open_interest,
                timestamp: 1_700_000_000_000 + i as i64 * 900_000,
            })
            .collect()
    }

    fn ratio_points(values: &[f64]) -> Vec<RatioPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &long_short_ratio)| RatioPoint {
                symbol: "BTCUSDT".to_string(),
                long_short_ratio,
                long_account: long_short_ratio / (1.0 + long_short_ratio),
                short_account: 1.0 / (1.0 + long_short_ratio),
                timestamp: 1_700_000_000_000 + i as i64 * 900_000,
            })
            .collect()
    }

    fn patterns(signals: &[Signal]) -> Vec<OpenInterestPattern> {
        signals
            .iter()
            .filter_map(|s| match &s.meta {
                SignalMeta::OpenInterest(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_volume_spike_fires_once() {
        let base = [95.0, 105.0, 98.0, 102.0, 100.0, 97.0, 103.0, 99.0, 101.0];
        let spike = stats::mean(&base) + 5.0 * stats::standard_deviation(&base);
        let mut volumes = base.to_vec();
        volumes.push(spike);

        let signal = detect_volume(&candles(&volumes)).expect("spike should fire");
        assert_eq!(signal.kind, SignalKind::Volume);
        assert_eq!(signal.symbol, "BTCUSDT");
        assert_eq!(
            signal.timestamp.timestamp_millis(),
            1_700_000_000_000 + 9 * 900_000
        );
        match signal.meta {
            SignalMeta::Volume {
                z_score, threshold, ..
            } => {
                assert!(z_score > 2.0);
                assert_eq!(threshold, 2.0);
            }
            other => panic!("unexpected meta {other:?}"),
        }
        assert!(signal.description.contains("threshold: 2.0"));
    }

    #[test]
    fn test_uniform_volume_is_quiet() {
        let volumes = [100.0, 101.0, 99.0, 100.5, 99.5, 100.0, 100.2, 99.8, 100.1, 100.0];
        assert!(detect_volume(&candles(&volumes)).is_none());
    }

    #[test]
    fn test_volume_needs_two_candles() {
        assert!(detect_volume(&[]).is_none());
        assert!(detect_volume(&candles(&[1_000_000.0])).is_none());
    }

    #[test]
    fn test_oi_24h_change() {
        let mut values = vec![50_000.0; 96];
        values.push(57_500.0);

        let signals = detect_open_interest(&oi_points(&values));
        let change = patterns(&signals)
            .into_iter()
            .find_map(|p| match p {
                OpenInterestPattern::Change24h { change_percent_24h } => Some(change_percent_24h),
                _ => None,
            })
            .expect("24h pattern should fire");
        assert!((change - 15.0).abs() < 1e-9);
        assert!(signals.iter().all(|s| s.kind == SignalKind::OpenInterest));
    }

    #[test]
    fn test_oi_24h_requires_full_window() {
        let mut values = vec![50_000.0; 94];
        values.push(57_500.0);
        let found = patterns(&detect_open_interest(&oi_points(&values)))
            .into_iter()
            .any(|p| matches!(p, OpenInterestPattern::Change24h { .. }));
        assert!(!found);
    }

    #[test]
    fn test_oi_24h_skips_zero_reference() {
        let mut values = vec![0.0; 96];
        values.push(57_500.0);
        let found = patterns(&detect_open_interest(&oi_points(&values)))
            .into_iter()
            .any(|p| matches!(p, OpenInterestPattern::Change24h { .. }));
        assert!(!found);
    }

    #[test]
    fn test_oi_run_rise_on_five_points() {
        let values = [1000.0, 1001.0, 1002.0, 1003.0, 1004.0];
        let found = patterns(&detect_open_interest(&oi_points(&values)));
        assert_eq!(
            found,
            vec![OpenInterestPattern::Run {
                consecutive_periods: 4,
                direction: RunDirection::Rise,
            }]
        );
    }

    #[test]
    fn test_oi_run_fall() {
        let values = [1010.0, 1009.0, 1008.0, 1007.0, 1006.0];
        let signals = detect_open_interest(&oi_points(&values));
        assert_eq!(signals.len(), 1);
        assert!(signals[0].description.contains("fell"));
    }

    #[test]
    fn test_oi_flat_step_breaks_run() {
        let values = [1000.0, 1001.0, 1001.0, 1002.0, 1003.0];
        assert!(detect_open_interest(&oi_points(&values)).is_empty());
    }

    #[test]
    fn test_oi_spike_and_run_co_fire() {
        let values = [1000.0, 1010.0, 1020.0, 1030.0, 1100.0];
        let found = patterns(&detect_open_interest(&oi_points(&values)));
        assert_eq!(found.len(), 2);
        assert!(matches!(found[0], OpenInterestPattern::Run { .. }));
        match found[1] {
            OpenInterestPattern::Spike { change_percent_1p } => {
                assert!((change_percent_1p - 6.796_116_504_854_369).abs() < 1e-9)
            }
            ref other => panic!("unexpected pattern {other:?}"),
        }
    }

    #[test]
    fn test_oi_spike_skips_zero_previous() {
        let values = [0.0, 5000.0];
        assert!(detect_open_interest(&oi_points(&values)).is_empty());
    }

    #[test]
    fn test_oi_short_series() {
        assert!(detect_open_interest(&[]).is_empty());
        assert!(detect_open_interest(&oi_points(&[1000.0])).is_empty());
    }

    #[test]
    fn test_ratio_extreme() {
        let mut values = vec![1.5, 1.52, 1.48, 1.51, 1.49, 1.5, 1.53, 1.47, 1.5, 1.5];
        values.push(2.4);
        let signal = detect_long_short_ratio(&ratio_points(&values)).expect("should fire");
        assert_eq!(signal.kind, SignalKind::LongShortRatio);
        match signal.meta {
            SignalMeta::LongShortRatio { ls_ratio, z_score, .. } => {
                assert_eq!(ls_ratio, 2.4);
                assert!(z_score > 2.0);
            }
            other => panic!("unexpected meta {other:?}"),
        }
    }

    #[test]
    fn test_ratio_constant_is_quiet() {
        assert!(detect_long_short_ratio(&ratio_points(&[1.2; 30])).is_none());
        assert!(detect_long_short_ratio(&ratio_points(&[1.2])).is_none());
    }
}
