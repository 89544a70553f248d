// =============================================================================
// Indicator Calculators
// =============================================================================
//
// Pure, side-effect-free heuristics that turn raw price / sentiment inputs into
// an `IndicatorResult`.  None of them can fail: truncated history or degenerate
// input yields the indicator's documented neutral value with
// `triggered = false`, so the aggregator never sees an error.

pub mod kimchi;
pub mod nupl;
pub mod onchain_proxy;
pub mod pi_cycle;
pub mod rsi;
pub mod sentiment;
pub mod stats;

use serde::{Deserialize, Serialize};

use crate::types::Indicator;

pub use kimchi::kimchi_premium;
pub use nupl::nupl_estimate;
pub use onchain_proxy::{exchange_balance_trend, long_term_holder_accumulation};
pub use pi_cycle::pi_cycle_top;
pub use rsi::weekly_rsi;
pub use sentiment::{fear_greed, google_trends_score};

/// One computed indicator for the current refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub name: Indicator,
    pub triggered: bool,
    /// Raw measurement (RSI 0–100, NUPL estimate 0–1, premium %, …).
    pub value: f64,
}

impl IndicatorResult {
    pub fn new(name: Indicator, value: f64, triggered: bool) -> Self {
        Self {
            name,
            triggered,
            value,
        }
    }

    /// The neutral fallback for `name`, used when its inputs are unavailable.
    pub fn fallback(name: Indicator) -> Self {
        Self::new(name, default_value(name), false)
    }
}

/// Documented neutral value per indicator.
pub fn default_value(name: Indicator) -> f64 {
    match name {
        Indicator::PiCycleTop => 0.0,
        Indicator::Nupl => nupl::NUPL_DEFAULT,
        Indicator::RsiWeekly => rsi::RSI_NEUTRAL,
        Indicator::GoogleTrends => sentiment::TRENDS_DEFAULT,
        Indicator::KimchiPremium => 0.0,
        Indicator::FearGreed => sentiment::FEAR_GREED_NEUTRAL,
        Indicator::ExchangeBalance => 0.0,
        Indicator::LongTermHolder => onchain_proxy::LTH_DEFAULT,
        Indicator::HalvingWindow => 0.0,
    }
}
