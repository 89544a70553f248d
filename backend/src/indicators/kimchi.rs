// =============================================================================
// Kimchi premium
// =============================================================================
//
// Gap between the Korean won price and the global USD price converted at spot
// FX, in percent.  A premium above 10 % marks retail euphoria.

use crate::indicators::IndicatorResult;
use crate::types::Indicator;

pub const KIMCHI_TRIGGER_PCT: f64 = 10.0;

/// `((krw - usd·fx) / (usd·fx)) · 100`; 0.0 unless all inputs are positive.
pub fn premium_pct(usd_price: f64, krw_price: f64, fx_rate: f64) -> f64 {
    if usd_price <= 0.0 || krw_price <= 0.0 || fx_rate <= 0.0 {
        return 0.0;
    }
    let usd_in_krw = usd_price * fx_rate;
    ((krw_price - usd_in_krw) / usd_in_krw) * 100.0
}

pub fn kimchi_premium(usd_price: f64, krw_price: f64, fx_rate: f64) -> IndicatorResult {
    let value = premium_pct(usd_price, krw_price, fx_rate);
    IndicatorResult::new(Indicator::KimchiPremium, value, value > KIMCHI_TRIGGER_PCT)
}
