// =============================================================================
// Refresh Pipeline — one end-to-end scoring cycle
// =============================================================================
//
// fetch (sequential, each defaulted on failure)
//   → indicators + halving cycle
//   → composite scores and tiers
//   → alert transitions → notifiers
//   → snapshot → sink
//
// Only one cycle runs at a time.  A caller must first win the
// "refresh in progress" flag through `try_begin`; losers are told the
// pipeline is busy instead of queueing.  Alert memory and source status live
// here and are only touched by the cycle holding the flag.
// =============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::alerts::{AlertState, FanoutNotifier};
use crate::cycle::{CycleInfo, HalvingSchedule};
use crate::error::{ConfigError, FetchError};
use crate::indicators::{self, IndicatorResult};
use crate::market_data::http::HISTORY_DAYS;
use crate::market_data::{MarketDataProvider, PriceSeries};
use crate::runtime_config::{HalvingWindowMonths, RuntimeConfig};
use crate::signals::{ScoreAggregator, ScoringInputs};
use crate::snapshot::model::{HalvingCycleView, Prices, TrackView};
use crate::snapshot::status::SourceStatusView;
use crate::snapshot::{DataStatusTracker, Snapshot, SnapshotSink};
use crate::types::Indicator;

// Lookback (days) handed to each history-based calculator.
const RSI_LOOKBACK: usize = 100;
const PI_CYCLE_LOOKBACK: usize = 365;
const NUPL_LOOKBACK: usize = 365;
const EXCHANGE_LOOKBACK: usize = 30;
const LTH_LOOKBACK: usize = 200;

// Minimum points each calculator needs before it stops defaulting.
const PI_CYCLE_MIN_POINTS: usize = 350;
const RSI_MIN_POINTS: usize = 99;
const EXCHANGE_MIN_POINTS: usize = 8;
const LTH_MIN_POINTS: usize = 151;

/// Proof that the holder owns the single refresh slot.  Releases it on drop.
#[derive(Debug)]
pub struct RefreshGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct RefreshPipeline {
    provider: Arc<dyn MarketDataProvider>,
    aggregator: ScoreAggregator,
    schedule: HalvingSchedule,
    window: HalvingWindowMonths,
    fallback_fx_rate: f64,
    notifier: FanoutNotifier,
    sink: Arc<dyn SnapshotSink>,
    running: Arc<AtomicBool>,
    alerts: Mutex<AlertState>,
    status: Mutex<DataStatusTracker>,
}

impl RefreshPipeline {
    pub fn new(
        config: &RuntimeConfig,
        provider: Arc<dyn MarketDataProvider>,
        notifier: FanoutNotifier,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            provider,
            aggregator: config.score_aggregator()?,
            schedule: config.halving_schedule.clone(),
            window: config.halving_window_months,
            fallback_fx_rate: config.fallback_fx_rate,
            notifier,
            sink,
            running: Arc::new(AtomicBool::new(false)),
            alerts: Mutex::new(AlertState::new()),
            status: Mutex::new(DataStatusTracker::new()),
        })
    }

    /// Claim the refresh slot, or `None` if a cycle is already running.
    pub fn try_begin(&self) -> Option<RefreshGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshGuard {
                flag: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn alert_state(&self) -> AlertState {
        self.alerts.lock().clone()
    }

    /// Seed source status from a snapshot restored at startup.
    pub fn restore_status(&self, view: &std::collections::BTreeMap<String, SourceStatusView>) {
        self.status.lock().restore(view);
    }

    /// Current per-source status with freshness as of `now`.
    pub fn status_view(&self, now: DateTime<Utc>) -> std::collections::BTreeMap<String, SourceStatusView> {
        self.status.lock().view(now)
    }

    /// Run one full cycle.  Never fails: every upstream problem is defaulted
    /// and surfaced through `data_status`.
    pub async fn run(&self, _guard: &RefreshGuard, now: DateTime<Utc>) -> Snapshot {
        let started = Instant::now();
        let cycle_id = Uuid::new_v4();
        let mut status = self.status.lock().clone();

        // ── Upstream fetches ────────────────────────────────────────────
        let usd = record(&mut status, "price_usd", self.provider.spot_price_usd().await, now);
        let krw = record(&mut status, "price_krw", self.provider.spot_price_krw().await, now);
        let fx = record(&mut status, "fx_rate", self.provider.usd_krw_rate().await, now)
            .unwrap_or(self.fallback_fx_rate);
        let history = record(
            &mut status,
            "price_history",
            self.provider.daily_prices(HISTORY_DAYS).await,
            now,
        );
        let history_available = history.is_some();
        let history = history.unwrap_or_default();

        let current_price = usd.or_else(|| history.last()).unwrap_or(0.0);

        // ── Heat indicators ─────────────────────────────────────────────
        derived(&mut status, "pi_cycle", history_available, &history, PI_CYCLE_MIN_POINTS, now);
        let pi_cycle = indicators::pi_cycle_top(history.tail(PI_CYCLE_LOOKBACK));

        derived(&mut status, "nupl", history_available && current_price > 0.0, &history, 1, now);
        let nupl = indicators::nupl_estimate(history.tail(NUPL_LOOKBACK), current_price);

        derived(&mut status, "rsi", history_available, &history, RSI_MIN_POINTS, now);
        let rsi = indicators::weekly_rsi(history.tail(RSI_LOOKBACK));

        let trends = record(
            &mut status,
            "google_trends",
            self.provider.search_interest().await,
            now,
        )
        .map(|interest| indicators::google_trends_score(&interest))
        .unwrap_or_else(|| IndicatorResult::fallback(Indicator::GoogleTrends));

        let usd_price = usd.unwrap_or(0.0);
        let krw_price = krw.unwrap_or(0.0);
        if usd_price > 0.0 && krw_price > 0.0 {
            status.record_success("kimchi_premium", now);
        } else {
            status.record_error("kimchi_premium", "spot price unavailable", now);
        }
        let kimchi = indicators::kimchi_premium(usd_price, krw_price, fx);

        let heat_results = [pi_cycle, nupl, rsi, trends, kimchi];

        // ── Accumulation indicators ─────────────────────────────────────
        let fear_greed = record(
            &mut status,
            "fear_greed",
            self.provider.fear_greed_index().await,
            now,
        )
        .map(indicators::fear_greed)
        .unwrap_or_else(|| IndicatorResult::fallback(Indicator::FearGreed));

        derived(&mut status, "exchange_balance", history_available, &history, EXCHANGE_MIN_POINTS, now);
        let exchange = indicators::exchange_balance_trend(history.tail(EXCHANGE_LOOKBACK));

        derived(&mut status, "long_term_holder", history_available, &history, LTH_MIN_POINTS, now);
        let lth = indicators::long_term_holder_accumulation(history.tail(LTH_LOOKBACK));

        // ── Halving cycle ───────────────────────────────────────────────
        let cycle = CycleInfo::evaluate(&self.schedule, now);
        let in_window = cycle.in_halving_window(self.window.min, self.window.max);
        let halving_row = IndicatorResult::new(
            Indicator::HalvingWindow,
            cycle.months_to_next_halving,
            in_window,
        );
        let accumulation_results = [fear_greed, exchange, lth, halving_row];

        // ── Scores ──────────────────────────────────────────────────────
        let cycle_weight = self.aggregator.cycle_weight();
        let breakdown = self.aggregator.aggregate(&ScoringInputs {
            heat: &heat_results,
            accumulation: &accumulation_results,
            cycle: cycle.contribution(cycle_weight),
            halving_window: in_window,
            fear_greed: fear_greed.value,
        });

        // ── Alerts ──────────────────────────────────────────────────────
        let events = self.alerts.lock().observe(
            &breakdown.heat,
            &breakdown.accumulation,
            cycle.phase,
            now,
        );
        if !events.is_empty() {
            self.notifier.deliver(&events).await;
        }

        // ── Snapshot ────────────────────────────────────────────────────
        let snapshot = Snapshot {
            cycle_id,
            timestamp: now,
            prices: Prices {
                usd: usd_price,
                krw: krw_price,
                fx_rate: fx,
                kimchi_premium: kimchi.value,
            },
            halving_cycle: HalvingCycleView::new(&cycle, cycle_weight, in_window),
            heat: TrackView::new(breakdown.heat, &heat_results),
            accumulation: TrackView::new(breakdown.accumulation, &accumulation_results),
            data_status: status.view(now),
        };
        *self.status.lock() = status;

        if let Err(e) = self.sink.persist(&snapshot) {
            error!(cycle_id = %cycle_id, error = %e, "snapshot persistence failed, previous file kept");
        }

        info!(
            cycle_id = %cycle_id,
            heat = snapshot.heat.composite.score,
            heat_level = snapshot.heat.composite.level,
            accumulation = snapshot.accumulation.composite.score,
            accumulation_level = snapshot.accumulation.composite.level,
            phase = %cycle.phase,
            alerts = events.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refresh cycle complete"
        );

        snapshot
    }
}

/// Record a fetch outcome and turn it into an optional value.
fn record<T>(
    status: &mut DataStatusTracker,
    source: &'static str,
    result: Result<T, FetchError>,
    now: DateTime<Utc>,
) -> Option<T> {
    match result {
        Ok(value) => {
            status.record_success(source, now);
            Some(value)
        }
        Err(e) => {
            warn!(source, error = %e, "upstream fetch failed, using default");
            status.record_error(source, &e, now);
            None
        }
    }
}

/// Status of a history-derived calculator.
fn derived(
    status: &mut DataStatusTracker,
    source: &'static str,
    inputs_available: bool,
    history: &PriceSeries,
    required: usize,
    now: DateTime<Utc>,
) {
    if !inputs_available {
        status.record_error(source, "input data unavailable", now);
    } else if history.len() < required {
        warn!(source, points = history.len(), required, "insufficient history, using default");
        status.record_error(
            source,
            format!("insufficient history: {} of {required} points", history.len()),
            now,
        );
    } else {
        status.record_success(source, now);
    }
}
