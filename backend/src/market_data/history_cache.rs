// =============================================================================
// Daily History Cache
// =============================================================================
//
// Daily closes move once a day, so the provider fetches the widest lookback
// once and serves every narrower request as a tail of it until the TTL runs
// out.  An expired entry is kept so a failed refetch can still fall back to
// the last good series.
// =============================================================================

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::market_data::PriceSeries;

struct Entry {
    fetched_at: Instant,
    width: usize,
    series: PriceSeries,
}

pub struct HistoryCache {
    ttl: Duration,
    entry: Mutex<Option<Entry>>,
}

impl HistoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// The last `days` points if a fetch at least that wide is younger than
    /// the TTL as of `now`.
    pub fn fresh(&self, days: usize, now: Instant) -> Option<PriceSeries> {
        let entry = self.entry.lock();
        let entry = entry.as_ref()?;
        let age = now.saturating_duration_since(entry.fetched_at);
        (age < self.ttl && days <= entry.width).then(|| tail_of(&entry.series, days))
    }

    /// The last `days` points of whatever was cached, regardless of age.
    pub fn stale(&self, days: usize) -> Option<PriceSeries> {
        let entry = self.entry.lock();
        entry
            .as_ref()
            .filter(|e| days <= e.width)
            .map(|e| tail_of(&e.series, days))
    }

    /// Replace the cached series, fetched `width` days wide at `now`, and
    /// return its last `days` points.
    pub fn store(&self, width: usize, series: PriceSeries, days: usize, now: Instant) -> PriceSeries {
        let tail = tail_of(&series, days);
        *self.entry.lock() = Some(Entry {
            fetched_at: now,
            width,
            series,
        });
        tail
    }
}

fn tail_of(series: &PriceSeries, days: usize) -> PriceSeries {
    PriceSeries::new(series.tail(days).to_vec())
}

impl std::fmt::Debug for HistoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryCache").field("ttl", &self.ttl).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> PriceSeries {
        PriceSeries::new((1..=n).map(|i| i as f64).collect())
    }

    fn cache() -> HistoryCache {
        HistoryCache::new(Duration::from_secs(1800))
    }

    #[test]
    fn empty_cache_misses() {
        let c = cache();
        assert!(c.fresh(30, Instant::now()).is_none());
        assert!(c.stale(30).is_none());
    }

    #[test]
    fn store_returns_the_requested_tail() {
        let c = cache();
        let tail = c.store(365, series(365), 100, Instant::now());
        assert_eq!(tail.len(), 100);
        assert_eq!(tail.last(), Some(365.0));
        assert_eq!(tail.tail(100)[0], 266.0);
    }

    #[test]
    fn narrower_lookbacks_are_tails_within_ttl() {
        let c = cache();
        let t0 = Instant::now();
        c.store(365, series(365), 365, t0);

        let later = t0 + Duration::from_secs(600);
        let week = c.fresh(7, later).unwrap();
        assert_eq!(week.tail(7), &[359.0, 360.0, 361.0, 362.0, 363.0, 364.0, 365.0]);
        assert_eq!(c.fresh(200, later).unwrap().len(), 200);
        assert_eq!(c.fresh(365, later).unwrap().len(), 365);
    }

    #[test]
    fn wider_request_than_cached_misses() {
        let c = cache();
        let t0 = Instant::now();
        c.store(365, series(365), 365, t0);
        assert!(c.fresh(500, t0).is_none());
        assert!(c.stale(500).is_none());
    }

    #[test]
    fn entry_expires_after_ttl_but_stays_available_as_stale() {
        let c = cache();
        let t0 = Instant::now();
        c.store(365, series(365), 365, t0);

        assert!(c.fresh(30, t0 + Duration::from_secs(1799)).is_some());
        assert!(c.fresh(30, t0 + Duration::from_secs(1800)).is_none());

        let stale = c.stale(30).unwrap();
        assert_eq!(stale.len(), 30);
        assert_eq!(stale.last(), Some(365.0));
    }

    #[test]
    fn short_upstream_series_is_served_whole() {
        let c = cache();
        let t0 = Instant::now();
        c.store(365, series(120), 365, t0);
        assert_eq!(c.fresh(200, t0).unwrap().len(), 120);
    }
}
