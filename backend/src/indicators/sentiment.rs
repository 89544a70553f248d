// =============================================================================
// Sentiment inputs — search interest surge and Fear & Greed
// =============================================================================

use crate::indicators::IndicatorResult;
use crate::types::Indicator;

/// Score used when search-interest data is unavailable.
pub const TRENDS_DEFAULT: f64 = 0.3;
pub const TRENDS_TRIGGER: f64 = 0.7;
/// A surge ratio of 1.5 (50 % above average) saturates the score.
const SURGE_SPAN: f64 = 0.5;

pub const FEAR_GREED_NEUTRAL: f64 = 50.0;
pub const FEAR_TRIGGER: f64 = 30.0;

/// Score a search-interest series: latest point relative to the series mean.
///
/// `score = clamp((surge - 1) / 0.5, 0, 1)` when `surge > 1`, else 0.
pub fn google_trends_score(interest: &[f64]) -> IndicatorResult {
    let Some(&recent) = interest.last() else {
        return IndicatorResult::fallback(Indicator::GoogleTrends);
    };

    let avg = interest.iter().sum::<f64>() / interest.len() as f64;
    let surge = if avg > 0.0 { recent / avg } else { 1.0 };
    let score = surge_score(surge);

    IndicatorResult::new(Indicator::GoogleTrends, score, score > TRENDS_TRIGGER)
}

/// Map a surge ratio onto [0, 1].
pub fn surge_score(surge_ratio: f64) -> f64 {
    if surge_ratio > 1.0 {
        ((surge_ratio - 1.0) / SURGE_SPAN).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Fear & Greed index (0 = extreme fear, 100 = extreme greed).
/// Fear below 30 is an accumulation signal.
pub fn fear_greed(index: u8) -> IndicatorResult {
    let value = f64::from(index.min(100));
    IndicatorResult::new(Indicator::FearGreed, value, value < FEAR_TRIGGER)
}
