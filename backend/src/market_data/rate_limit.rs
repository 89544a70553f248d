// =============================================================================
// Minimum-Interval Gate — per-source politeness for public APIs
// =============================================================================
//
// Free public endpoints (CoinGecko, alternative.me, Google Trends) throttle
// aggressively.  Each configured source gets a minimum spacing between calls;
// a caller arriving early sleeps until its slot.  Slots are reserved under the
// lock and the sleep happens outside it, so concurrent callers queue up
// behind each other instead of firing together.  Unconfigured sources pass
// straight through.
// =============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

pub struct MinIntervalGate {
    intervals: HashMap<String, Duration>,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl MinIntervalGate {
    pub fn new(intervals: impl IntoIterator<Item = (String, Duration)>) -> Self {
        Self {
            intervals: intervals.into_iter().collect(),
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self, source: &str) -> Option<Duration> {
        self.intervals.get(source).copied()
    }

    /// Wait until `source` may be called again, then claim the slot.
    pub async fn wait(&self, source: &str) {
        if let Some(delay) = self.reserve(source, Instant::now()) {
            debug!(source, delay_ms = delay.as_millis() as u64, "rate gate: deferring call");
            tokio::time::sleep(delay).await;
        }
    }

    /// Claim the next free slot for `source` as of `now` and return how long
    /// the caller must wait for it.
    fn reserve(&self, source: &str, now: Instant) -> Option<Duration> {
        let interval = self.interval(source)?;
        let mut slots = self.next_slot.lock();

        let slot = match slots.get(source) {
            Some(&earliest) if earliest > now => earliest,
            _ => now,
        };
        slots.insert(source.to_string(), slot + interval);

        let delay = slot.saturating_duration_since(now);
        (!delay.is_zero()).then_some(delay)
    }
}

impl std::fmt::Debug for MinIntervalGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinIntervalGate")
            .field("intervals", &self.intervals)
            .finish()
    }
}
