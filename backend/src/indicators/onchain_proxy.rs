// =============================================================================
// On-chain proxies derived from price alone
// =============================================================================
//
// Exchange balances and long-term-holder supply normally come from on-chain
// analytics.  Both are approximated here from the daily price series:
//
//   * Exchange balance trend: volatility contraction over the last week vs
//     the week before.  Falling volatility is read as coins leaving exchanges.
//   * Long-term-holder accumulation: 150-day price change.  Drawdowns are read
//     as strong-hand accumulation; rallies as distribution.

use crate::indicators::stats::population_std;
use crate::indicators::IndicatorResult;
use crate::types::Indicator;

const WEEK: usize = 7;
pub const EXCHANGE_TREND_TRIGGER: f64 = 0.3;

pub const LTH_DEFAULT: f64 = 0.5;
pub const LTH_TRIGGER: f64 = 0.6;
const LTH_LOOKBACK: usize = 150;

/// `trend = 1 - std(last 7) / std(previous 7)`, clamped to [-1, 1].
///
/// Needs more than 7 points.  When fewer than 14 are available the previous
/// window is whatever precedes the last week.  A zero previous stdev yields 0.
pub fn exchange_balance_trend(daily_prices: &[f64]) -> IndicatorResult {
    let n = daily_prices.len();
    if n <= WEEK {
        return IndicatorResult::fallback(Indicator::ExchangeBalance);
    }

    let recent = &daily_prices[n - WEEK..];
    let previous = &daily_prices[n.saturating_sub(2 * WEEK)..n - WEEK];

    let prev_std = population_std(previous);
    if prev_std <= 0.0 {
        return IndicatorResult::fallback(Indicator::ExchangeBalance);
    }

    let trend = (1.0 - population_std(recent) / prev_std).clamp(-1.0, 1.0);
    IndicatorResult::new(
        Indicator::ExchangeBalance,
        trend,
        trend > EXCHANGE_TREND_TRIGGER,
    )
}

/// Accumulation estimate from the change versus 150 days ago.
///
/// Negative change `c` => `min(|c|·2, 1)`; otherwise `max(1 - c, 0)`.
/// Needs more than 150 points.
pub fn long_term_holder_accumulation(daily_prices: &[f64]) -> IndicatorResult {
    let n = daily_prices.len();
    if n <= LTH_LOOKBACK {
        return IndicatorResult::fallback(Indicator::LongTermHolder);
    }

    let then = daily_prices[n - LTH_LOOKBACK];
    let now = daily_prices[n - 1];
    if then <= 0.0 {
        return IndicatorResult::fallback(Indicator::LongTermHolder);
    }

    let change = (now - then) / then;
    let value = if change < 0.0 {
        (change.abs() * 2.0).min(1.0)
    } else {
        (1.0 - change).max(0.0)
    };

    IndicatorResult::new(Indicator::LongTermHolder, value, value > LTH_TRIGGER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(len: usize, amplitude: f64) -> Vec<f64> {
        (0..len)
            .map(|i| if i % 2 == 0 { 100.0 } else { 100.0 + amplitude })
            .collect()
    }

    // ---- exchange_balance_trend -------------------------------------------

    #[test]
    fn exchange_trend_needs_more_than_a_week() {
        let r = exchange_balance_trend(&[1.0, 5.0, 2.0, 8.0, 3.0, 9.0, 4.0]);
        assert_eq!(r.value, 0.0);
        assert!(!r.triggered);
    }

    #[test]
    fn exchange_trend_volatility_contraction_triggers() {
        let mut prices = alternating(7, 20.0);
        prices.extend(alternating(7, 2.0));
        let r = exchange_balance_trend(&prices);
        assert!(r.value > 0.8, "trend {}", r.value);
        assert!(r.triggered);
    }

    #[test]
    fn exchange_trend_expansion_is_clamped() {
        let mut prices = alternating(7, 1.0);
        prices.extend(alternating(7, 100.0));
        let r = exchange_balance_trend(&prices);
        assert_eq!(r.value, -1.0);
        assert!(!r.triggered);
    }

    #[test]
    fn exchange_trend_flat_previous_week_is_neutral() {
        let mut prices = vec![100.0; 7];
        prices.extend(alternating(7, 5.0));
        assert_eq!(exchange_balance_trend(&prices).value, 0.0);
    }

    #[test]
    fn exchange_trend_single_previous_point_is_neutral() {
        // 8 points => previous window has one element => stdev 0.
        let prices = alternating(8, 5.0);
        assert_eq!(exchange_balance_trend(&prices).value, 0.0);
    }

    // ---- long_term_holder_accumulation ------------------------------------

    #[test]
    fn lth_needs_more_than_150_points() {
        let r = long_term_holder_accumulation(&vec![100.0; 150]);
        assert_eq!(r.value, LTH_DEFAULT);
        assert!(!r.triggered);
    }

    #[test]
    fn lth_drawdown_scores_high() {
        // 151 points: index 1 is "150 days ago".
        let mut prices = vec![100.0; 151];
        prices[150] = 60.0; // -40 % => 0.8
        let r = long_term_holder_accumulation(&prices);
        assert!((r.value - 0.8).abs() < 1e-12);
        assert!(r.triggered);
    }

    #[test]
    fn lth_rally_scores_low() {
        let mut prices = vec![100.0; 200];
        prices[199] = 150.0; // +50 % => 0.5
        let r = long_term_holder_accumulation(&prices);
        assert!((r.value - 0.5).abs() < 1e-12);
        assert!(!r.triggered);
    }

    #[test]
    fn lth_doubling_floors_at_zero() {
        let mut prices = vec![100.0; 200];
        prices[199] = 300.0;
        assert_eq!(long_term_holder_accumulation(&prices).value, 0.0);
    }
}
