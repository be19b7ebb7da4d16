//! Descriptive statistics and indicators over plain `f64` series.
//!
//! Every function degrades to `0.0` on insufficient input instead of
//! returning an error, so callers can treat "not enough data" as "no signal".

/// Arithmetic mean, `0.0` for an empty series
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N), `0.0` below two samples
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Z-score of the last value against the whole series
pub fn z_score(values: &[f64]) -> f64 {
    let Some(&last) = values.last() else {
        return 0.0;
    };
    if values.len() < 2 {
        return 0.0;
    }
    let std_dev = standard_deviation(values);
    if std_dev == 0.0 {
        return 0.0;
    }
    (last - mean(values)) / std_dev
}

/// Exponential moving average seeded with the SMA of the first `period` values
pub fn ema(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return 0.0;
    }
    let multiplier = 2.0 / (period as f64 + 1.0);
    values[period..]
        .iter()
        .fold(mean(&values[..period]), |ema, v| (v - ema) * multiplier + ema)
}

/// Relative strength index with Wilder smoothing.
///
/// Returns 100 when there were no losses in the smoothed window.
pub fn rsi(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period + 1 {
        return 0.0;
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = values
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            if change > 0.0 {
                (change, 0.0)
            } else {
                (0.0, -change)
            }
        })
        .unzip();

    let weight = period as f64;
    let mut avg_gain = mean(&gains[..period]);
    let mut avg_loss = mean(&losses[..period]);
    for (gain, loss) in gains[period..].iter().zip(&losses[period..]) {
        avg_gain = (avg_gain * (weight - 1.0) + gain) / weight;
        avg_loss = (avg_loss * (weight - 1.0) + loss) / weight;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0, 6.0]), 4.0);
    }

    #[test]
    fn test_standard_deviation_is_population() {
        assert_eq!(standard_deviation(&[5.0]), 0.0);
        // population sd of [2,4,4,4,5,5,7,9] is exactly 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((standard_deviation(&values) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_z_score_short_series() {
        assert_eq!(z_score(&[]), 0.0);
        assert_eq!(z_score(&[42.0]), 0.0);
    }

    #[test]
    fn test_z_score_zero_variance() {
        let z = z_score(&[3.0; 20]);
        assert_eq!(z, 0.0);
        assert!(z.is_finite());
    }

    #[test]
    fn test_z_score_last_value() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // mean 5, sd 2, last 9
        assert!((z_score(&values) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_ema_insufficient_data() {
        assert_eq!(ema(&[1.0, 2.0], 3), 0.0);
        assert_eq!(ema(&[1.0, 2.0], 0), 0.0);
    }

    #[test]
    fn test_ema_seed_and_smoothing() {
        // seed = mean(1,2,3) = 2, multiplier = 0.5, next = (4-2)*0.5+2 = 3
        assert!((ema(&[1.0, 2.0, 3.0, 4.0], 3) - 3.0).abs() < EPS);
    }

    #[test]
    fn test_ema_constant_series_converges() {
        let values = vec![17.25; 60];
        assert!((ema(&values, 12) - 17.25).abs() < EPS);
        assert!((ema(&values, 26) - 17.25).abs() < EPS);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert_eq!(rsi(&[1.0; 14], 14), 0.0);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&values, 14), 100.0);

        // flat steps count as non-negative too
        let mut values = vec![10.0; 20];
        values.push(11.0);
        assert_eq!(rsi(&values, 14), 100.0);
    }

    #[test]
    fn test_rsi_all_losses_is_0() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert!(rsi(&values, 14).abs() < EPS);
    }

    #[test]
    fn test_rsi_bounded() {
        let values: Vec<f64> = (0..80)
            .map(|i| 100.0 + ((i * 37) % 11) as f64 - 5.0 + (i as f64 * 0.3).sin())
            .collect();
        for period in [2, 6, 14, 30] {
            let value = rsi(&values, period);
            assert!((0.0..=100.0).contains(&value), "rsi({period}) = {value}");
        }
    }

    #[test]
    fn test_rsi_wilder_step() {
        // period 2: changes +2, -1, +1
        // seed gain = 1.0, loss = 0.5; smoothed gain = (1.0 + 1)/2 = 1.0, loss = 0.25
        // rs = 4 -> rsi = 80
        let values = [10.0, 12.0, 11.0, 12.0];
        assert!((rsi(&values, 2) - 80.0).abs() < EPS);
    }
}
