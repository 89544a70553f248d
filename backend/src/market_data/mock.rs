// Canned provider for pipeline and API tests.  `None` fields fail.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::FetchError;
use crate::market_data::{MarketDataProvider, PriceSeries};

#[derive(Debug, Default)]
pub struct MockProvider {
    pub usd: Option<f64>,
    pub krw: Option<f64>,
    pub fx: Option<f64>,
    pub history: Option<Vec<f64>>,
    pub fear_greed: Option<u8>,
    pub interest: Option<Vec<f64>>,
    pub calls: AtomicUsize,
}

impl MockProvider {
    /// Every source answers with a flat, unremarkable market.
    pub fn healthy() -> Self {
        Self {
            usd: Some(50_000.0),
            krw: Some(67_500_000.0),
            fx: Some(1350.0),
            history: Some(vec![50_000.0; 400]),
            fear_greed: Some(50),
            interest: Some(vec![50.0; 24]),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every source fails.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn answer<T: Clone>(&self, value: &Option<T>) -> Result<T, FetchError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        value.clone().ok_or(FetchError::Status {
            source_name: "mock",
            status: 503,
        })
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn spot_price_usd(&self) -> Result<f64, FetchError> {
        self.answer(&self.usd)
    }

    async fn spot_price_krw(&self) -> Result<f64, FetchError> {
        self.answer(&self.krw)
    }

    async fn usd_krw_rate(&self) -> Result<f64, FetchError> {
        self.answer(&self.fx)
    }

    async fn daily_prices(&self, days: usize) -> Result<PriceSeries, FetchError> {
        let all = PriceSeries::new(self.answer(&self.history)?);
        Ok(PriceSeries::new(all.tail(days).to_vec()))
    }

    async fn fear_greed_index(&self) -> Result<u8, FetchError> {
        self.answer(&self.fear_greed)
    }

    async fn search_interest(&self) -> Result<Vec<f64>, FetchError> {
        self.answer(&self.interest)
    }
}
