// =============================================================================
// Relative Strength Index (RSI) — trailing simple averages
// =============================================================================
//
// Step 1: Compute price changes (deltas) from consecutive prices.
// Step 2: Average gain / average loss over the trailing `period` deltas
//          (plain arithmetic mean, no Wilder smoothing).
// Step 3: RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The weekly variant resamples daily prices by taking every 7th point and
// fires when the weekly RSI exceeds 85 (extreme overbought on the HTF).
// =============================================================================

use crate::indicators::stats::every_nth;
use crate::indicators::IndicatorResult;
use crate::types::Indicator;

/// Returned whenever there is not enough history.
pub const RSI_NEUTRAL: f64 = 50.0;
pub const RSI_PERIOD: usize = 14;
pub const WEEKLY_RSI_TRIGGER: f64 = 85.0;
const DAYS_PER_WEEK: usize = 7;

/// RSI of `prices` over the trailing `period` deltas.
///
/// # Edge cases
/// - `prices.len() < period + 1` or `period == 0` => 50.0 (neutral, not an error)
/// - average loss of zero => 100.0
pub fn calculate_rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return RSI_NEUTRAL;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let tail = &deltas[deltas.len() - period..];

    let (sum_gain, sum_loss) = tail.iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l - d)
        }
    });

    let period_f = period as f64;
    rsi_from_averages(sum_gain / period_f, sum_loss / period_f)
}

/// Weekly RSI(14) from a daily series.
pub fn weekly_rsi(daily_prices: &[f64]) -> IndicatorResult {
    let weekly = every_nth(daily_prices, DAYS_PER_WEEK);
    let value = calculate_rsi(&weekly, RSI_PERIOD);
    IndicatorResult::new(Indicator::RsiWeekly, value, value > WEEKLY_RSI_TRIGGER)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - 100.0 / (1.0 + rs);
    if rsi.is_finite() {
        rsi
    } else {
        RSI_NEUTRAL
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert_eq!(calculate_rsi(&[], 14), 50.0);
    }

    #[test]
    fn rsi_period_zero() {
        assert_eq!(calculate_rsi(&[1.0, 2.0, 3.0], 0), 50.0);
    }

    #[test]
    fn rsi_below_fifteen_points_is_neutral() {
        for n in 0..15 {
            let closes: Vec<f64> = (0..n).map(|x| (x * x) as f64).collect();
            assert_eq!(calculate_rsi(&closes, 14), 50.0, "len {n}");
        }
    }

    #[test]
    fn rsi_all_gains() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert_eq!(calculate_rsi(&closes, 14), 100.0);
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, 14).abs() < 1e-10);
    }

    #[test]
    fn rsi_flat_market_counts_as_no_loss() {
        assert_eq!(calculate_rsi(&[100.0; 30], 14), 100.0);
    }

    #[test]
    fn rsi_only_trailing_window_matters() {
        // Early crash is outside the trailing 14 deltas.
        let mut closes = vec![1000.0, 10.0];
        closes.extend((0..15).map(|x| 10.0 + x as f64));
        assert_eq!(calculate_rsi(&closes, 14), 100.0);
    }

    #[test]
    fn rsi_equal_gain_and_loss_is_fifty() {
        let closes: Vec<f64> = (0..15)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        assert!((calculate_rsi(&closes, 14) - 50.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let v = calculate_rsi(&closes, 14);
        assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
    }

    // ---- weekly_rsi ------------------------------------------------------

    #[test]
    fn weekly_rsi_needs_fifteen_weeks() {
        // 98 days => indices 0,7,..,91 => 14 weekly points => neutral.
        let daily: Vec<f64> = (0..98).map(|x| x as f64).collect();
        let r = weekly_rsi(&daily);
        assert_eq!(r.value, 50.0);
        assert!(!r.triggered);
    }

    #[test]
    fn weekly_rsi_triggers_on_parabolic_rise() {
        let daily: Vec<f64> = (0..100).map(|x| 1000.0 + x as f64 * 10.0).collect();
        let r = weekly_rsi(&daily);
        assert_eq!(r.name, Indicator::RsiWeekly);
        assert_eq!(r.value, 100.0);
        assert!(r.triggered);
    }
}
