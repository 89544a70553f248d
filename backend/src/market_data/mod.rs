// =============================================================================
// Market Data — provider seam between the pipeline and the outside world
// =============================================================================
//
// Every signal the pipeline needs comes through `MarketDataProvider`.  The
// HTTP implementation walks an ordered list of public sources per signal;
// tests swap in `MockProvider`.
// =============================================================================

pub mod history_cache;
pub mod http;
#[cfg(test)]
pub mod mock;
pub mod rate_limit;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FetchError;

pub use http::HttpMarketData;

/// Daily closing prices, oldest first.  Never holds negative or non-finite
/// values; may be shorter than the requested lookback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries(Vec<f64>);

impl PriceSeries {
    /// Build a series, dropping points that are negative or not finite.
    /// Dropping shifts day positions, so upstream parsers reject such input
    /// before it gets here; anything that slips through is logged.
    pub fn new(prices: Vec<f64>) -> Self {
        let total = prices.len();
        let kept: Vec<f64> = prices
            .into_iter()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .collect();
        if kept.len() < total {
            warn!(dropped = total - kept.len(), total, "invalid points removed from price series");
        }
        Self(kept)
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// The most recent `n` points (all of them if shorter).
    pub fn tail(&self, n: usize) -> &[f64] {
        &self.0[self.0.len().saturating_sub(n)..]
    }

    pub fn last(&self) -> Option<f64> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// BTC spot price in USD.
    async fn spot_price_usd(&self) -> Result<f64, FetchError>;

    /// BTC spot price on Korean exchanges, in KRW.
    async fn spot_price_krw(&self) -> Result<f64, FetchError>;

    /// KRW per USD.
    async fn usd_krw_rate(&self) -> Result<f64, FetchError>;

    /// Daily USD closes for the last `days` days.
    async fn daily_prices(&self, days: usize) -> Result<PriceSeries, FetchError>;

    /// Crypto Fear & Greed index, 0..=100.
    async fn fear_greed_index(&self) -> Result<u8, FetchError>;

    /// Recent search-interest series for the asset, oldest first.
    async fn search_interest(&self) -> Result<Vec<f64>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_drops_invalid_points() {
        let s = PriceSeries::new(vec![1.0, -2.0, f64::NAN, 3.0, f64::INFINITY, 0.0]);
        assert_eq!(s.as_slice(), &[1.0, 3.0, 0.0]);
        assert_eq!(s.last(), Some(0.0));
    }

    #[test]
    fn tail_is_clamped_to_length() {
        let s = PriceSeries::new((1..=10).map(f64::from).collect());
        assert_eq!(s.tail(3), &[8.0, 9.0, 10.0]);
        assert_eq!(s.tail(100).len(), 10);
        assert!(PriceSeries::default().tail(5).is_empty());
    }
}
