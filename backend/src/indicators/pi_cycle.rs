// =============================================================================
// Pi Cycle Top
// =============================================================================
//
// Fires when twice the 111-day moving average exceeds the 350-day moving
// average by more than 5 %.  Needs at least 350 daily points; anything shorter
// is simply "not triggered".

use crate::indicators::stats::trailing_mean;
use crate::indicators::IndicatorResult;
use crate::types::Indicator;

pub const FAST_PERIOD: usize = 111;
pub const SLOW_PERIOD: usize = 350;
const SLOW_MARGIN: f64 = 1.05;

/// `value` is the ratio `2·MA111 / MA350` (0.0 when not computable).
pub fn pi_cycle_top(daily_prices: &[f64]) -> IndicatorResult {
    if daily_prices.len() < SLOW_PERIOD {
        return IndicatorResult::fallback(Indicator::PiCycleTop);
    }

    let (Some(ma_fast), Some(ma_slow)) = (
        trailing_mean(daily_prices, FAST_PERIOD),
        trailing_mean(daily_prices, SLOW_PERIOD),
    ) else {
        return IndicatorResult::fallback(Indicator::PiCycleTop);
    };

    let triggered = ma_fast * 2.0 > ma_slow * SLOW_MARGIN;
    let ratio = if ma_slow > 0.0 { ma_fast * 2.0 / ma_slow } else { 0.0 };

    IndicatorResult::new(Indicator::PiCycleTop, ratio, triggered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_never_triggers() {
        // Even an absurd blow-off top must not trigger with < 350 points.
        let prices: Vec<f64> = (0..349).map(|x| (x as f64).powi(3)).collect();
        let r = pi_cycle_top(&prices);
        assert!(!r.triggered);
        assert_eq!(r.value, 0.0);
    }

    #[test]
    fn flat_market_triggers_because_double_fast_ma_dominates() {
        // 2 * 100 > 100 * 1.05, so the literal rule fires on any flat series.
        let r = pi_cycle_top(&vec![100.0; 365]);
        assert!(r.triggered);
        assert!((r.value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn deep_recent_crash_does_not_trigger() {
        // Slow MA dominated by high prices, fast MA by a crash to ~1 %.
        let mut prices = vec![10_000.0; 239];
        prices.extend(std::iter::repeat(10.0).take(111));
        let r = pi_cycle_top(&prices);
        assert!(!r.triggered, "ratio {}", r.value);
    }

    #[test]
    fn exactly_350_points_is_enough() {
        let r = pi_cycle_top(&vec![1.0; 350]);
        assert!(r.triggered);
    }
}
