// =============================================================================
// Central Application State
// =============================================================================
//
// Ties the refresh pipeline to what the web layer serves: the latest
// snapshot, a capped rolling history and a version counter bumped on every
// publish.  Shared across tasks as `Arc<AppState>`.
//
// Thread safety:
//   - AtomicU64 for lock-free version tracking.
//   - parking_lot::RwLock for the snapshot and history.
//   - The pipeline guards its own mutable state.
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::pipeline::{RefreshGuard, RefreshPipeline};
use crate::snapshot::status::refresh_freshness;
use crate::snapshot::{HistoryEntry, Snapshot};

pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Incremented on every published snapshot.
    pub state_version: AtomicU64,

    // ── Pipeline ────────────────────────────────────────────────────────
    pub pipeline: Arc<RefreshPipeline>,

    // ── Served data ─────────────────────────────────────────────────────
    latest: RwLock<Option<Snapshot>>,
    history: RwLock<VecDeque<HistoryEntry>>,
    history_capacity: usize,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    /// `initial` is a snapshot restored from disk, served until the first
    /// cycle completes.
    pub fn new(pipeline: Arc<RefreshPipeline>, history_capacity: usize, initial: Option<Snapshot>) -> Self {
        let state = Self {
            state_version: AtomicU64::new(0),
            pipeline,
            latest: RwLock::new(None),
            history: RwLock::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            start_time: std::time::Instant::now(),
        };
        if let Some(snapshot) = initial {
            info!(cycle_id = %snapshot.cycle_id, "serving restored snapshot");
            state.pipeline.restore_status(&snapshot.data_status);
            state.publish(snapshot);
        }
        state
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Publishing ──────────────────────────────────────────────────────

    /// Replace the served snapshot and append to the rolling history.  The
    /// history is capped at `history_capacity`; oldest entries are evicted.
    pub fn publish(&self, snapshot: Snapshot) {
        {
            let mut history = self.history.write();
            history.push_back(HistoryEntry::from(&snapshot));
            while history.len() > self.history_capacity {
                history.pop_front();
            }
        }
        *self.latest.write() = Some(snapshot);
        let version = self.increment_version();
        debug!(version, "snapshot published");
    }

    /// Run one cycle under an already-claimed guard and publish its result.
    pub async fn refresh_with(&self, guard: RefreshGuard) {
        let snapshot = self.pipeline.run(&guard, Utc::now()).await;
        self.publish(snapshot);
        drop(guard);
    }

    /// Run one cycle if none is in progress.  Returns `false` when busy.
    pub async fn refresh(&self) -> bool {
        match self.pipeline.try_begin() {
            Some(guard) => {
                self.refresh_with(guard).await;
                true
            }
            None => false,
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Latest snapshot with `data_status` freshness recomputed for now.
    pub fn latest(&self) -> Option<Snapshot> {
        let mut snapshot = self.latest.read().clone()?;
        refresh_freshness(&mut snapshot.data_status, Utc::now());
        Some(snapshot)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.read().iter().cloned().collect()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::app_state;
    use super::*;
    use crate::market_data::mock::MockProvider;
    use crate::snapshot::model::fixtures::sample_snapshot;

    #[test]
    fn starts_empty_without_restored_snapshot() {
        let state = app_state(MockProvider::healthy(), None);
        assert!(state.latest().is_none());
        assert!(state.history().is_empty());
        assert_eq!(state.current_state_version(), 0);
    }

    #[test]
    fn restored_snapshot_is_served() {
        let snap = sample_snapshot();
        let state = app_state(MockProvider::healthy(), Some(snap.clone()));
        assert_eq!(state.latest().unwrap().cycle_id, snap.cycle_id);
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.current_state_version(), 1);
    }

    #[test]
    fn history_is_capped() {
        let state = app_state(MockProvider::healthy(), None);
        for _ in 0..130 {
            state.publish(sample_snapshot());
        }
        assert_eq!(state.history().len(), 100);
        assert_eq!(state.current_state_version(), 130);
    }

    #[tokio::test]
    async fn refresh_publishes_and_rejects_when_busy() {
        let state = app_state(MockProvider::healthy(), None);
        assert!(state.refresh().await);
        assert!(state.latest().is_some());
        assert_eq!(state.history().len(), 1);

        let _held = state.pipeline.try_begin().unwrap();
        assert!(!state.refresh().await);
        assert_eq!(state.history().len(), 1);
    }
}
