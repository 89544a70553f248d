// =============================================================================
// NUPL estimate (price-only proxy)
// =============================================================================
//
// Real NUPL needs on-chain realized cap.  The proxy treats MA200 as a stand-in
// for realized price:
//
//   mvrv  = current / MA200
//   nupl  = (mvrv - 1) / mvrv        when mvrv > 1, else 0
//   pos   = current / max(prices)
//   value = min(0.7·nupl + 0.3·pos, 0.95)
//
// Triggers above 0.75 (euphoria band).

use crate::indicators::stats::trailing_mean;
use crate::indicators::IndicatorResult;
use crate::types::Indicator;

pub const NUPL_DEFAULT: f64 = 0.5;
pub const NUPL_TRIGGER: f64 = 0.75;
const MA_PERIOD: usize = 200;
const NUPL_WEIGHT: f64 = 0.7;
const POSITION_WEIGHT: f64 = 0.3;
const NUPL_CAP: f64 = 0.95;

pub fn nupl_estimate(daily_prices: &[f64], current_price: f64) -> IndicatorResult {
    if current_price <= 0.0 {
        return IndicatorResult::fallback(Indicator::Nupl);
    }

    let Some(ma200) = trailing_mean(daily_prices, MA_PERIOD).filter(|ma| *ma > 0.0) else {
        return IndicatorResult::fallback(Indicator::Nupl);
    };

    let mvrv = current_price / ma200;
    let nupl = if mvrv > 1.0 { (mvrv - 1.0) / mvrv } else { 0.0 };

    let peak = daily_prices.iter().copied().fold(f64::MIN, f64::max);
    let position = if peak > 0.0 { current_price / peak } else { 0.0 };

    let value = (NUPL_WEIGHT * nupl + POSITION_WEIGHT * position).min(NUPL_CAP);
    IndicatorResult::new(Indicator::Nupl, value, value > NUPL_TRIGGER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_falls_back() {
        let r = nupl_estimate(&[], 50_000.0);
        assert_eq!(r.value, NUPL_DEFAULT);
        assert!(!r.triggered);
    }

    #[test]
    fn missing_current_price_falls_back() {
        let r = nupl_estimate(&[100.0; 10], 0.0);
        assert_eq!(r.value, NUPL_DEFAULT);
    }

    #[test]
    fn price_at_average_and_peak() {
        // mvrv = 1 => nupl 0; position = 1 => 0.3.
        let r = nupl_estimate(&[100.0; 250], 100.0);
        assert!((r.value - 0.3).abs() < 1e-12);
        assert!(!r.triggered);
    }

    #[test]
    fn short_history_uses_all_points() {
        // MA = 150 over 2 points; current 300 => mvrv 2 => nupl 0.5.
        // peak 200 => position 1.5. 0.35 + 0.45 = 0.8.
        let r = nupl_estimate(&[100.0, 200.0], 300.0);
        assert!((r.value - 0.8).abs() < 1e-12);
        assert!(r.triggered);
    }

    #[test]
    fn value_is_capped() {
        let r = nupl_estimate(&[1.0; 300], 1_000_000.0);
        assert_eq!(r.value, 0.95);
        assert!(r.triggered);
    }
}
