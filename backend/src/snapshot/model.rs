// =============================================================================
// Snapshot document
// =============================================================================
//
// The complete, best-effort result of one refresh cycle.  Every field is
// always present; a failed source shows up through `data_status` rather than
// through a missing value.
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cycle::{CycleInfo, CyclePhase, CycleStance};
use crate::indicators::IndicatorResult;
use crate::signals::CompositeScore;
use crate::snapshot::status::SourceStatusView;
use crate::types::Indicator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub prices: Prices,
    pub halving_cycle: HalvingCycleView,
    pub heat: TrackView,
    pub accumulation: TrackView,
    pub data_status: BTreeMap<String, SourceStatusView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prices {
    pub usd: f64,
    pub krw: f64,
    pub fx_rate: f64,
    pub kimchi_premium: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalvingCycleView {
    pub phase: CyclePhase,
    pub months_since: f64,
    pub months_to_next: f64,
    pub cycle_position_pct: f64,
    /// Signed phase score in [-100, 100].
    pub score: f64,
    pub weight: f64,
    pub recommendation: String,
    pub stance: CycleStance,
    pub halving_number: u32,
    pub next_halving: Option<NaiveDate>,
    pub next_halving_estimated: bool,
    pub in_halving_window: bool,
}

impl HalvingCycleView {
    pub fn new(info: &CycleInfo, weight: f64, in_halving_window: bool) -> Self {
        Self {
            phase: info.phase,
            months_since: info.months_since_halving,
            months_to_next: info.months_to_next_halving,
            cycle_position_pct: info.cycle_position_pct,
            score: info.phase_score,
            weight,
            recommendation: info.phase.recommendation().to_string(),
            stance: info.phase.stance(),
            halving_number: info.halving_number,
            next_halving: info.next_halving,
            next_halving_estimated: info.next_halving_estimated,
            in_halving_window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorView {
    pub value: f64,
    pub triggered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackView {
    #[serde(flatten)]
    pub composite: CompositeScore,
    pub indicators: BTreeMap<Indicator, IndicatorView>,
}

impl TrackView {
    pub fn new(composite: CompositeScore, results: &[IndicatorResult]) -> Self {
        Self {
            composite,
            indicators: results
                .iter()
                .map(|r| {
                    (
                        r.name,
                        IndicatorView {
                            value: r.value,
                            triggered: r.triggered,
                        },
                    )
                })
                .collect(),
        }
    }
}

/// One row of the rolling history served at `/api/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub heat_score: f64,
    pub acc_score: f64,
    pub price: f64,
}

impl From<&Snapshot> for HistoryEntry {
    fn from(s: &Snapshot) -> Self {
        Self {
            timestamp: s.timestamp,
            heat_score: s.heat.composite.score,
            acc_score: s.accumulation.composite.score,
            price: s.prices.usd,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_has_expected_shape() {
        let snap = fixtures::sample_snapshot();
        let json = serde_json::to_value(&snap).unwrap();

        assert!(json["timestamp"].is_string());
        assert_eq!(json["prices"]["kimchi_premium"], 3.7);
        assert!(json["halving_cycle"]["phase"].is_string());
        assert!(json["halving_cycle"]["recommendation"].is_string());
        assert_eq!(json["heat"]["level"], 0);
        assert_eq!(json["heat"]["action"], "hold");
        assert_eq!(json["heat"]["indicators"]["rsi_weekly"]["value"], 62.0);
        assert_eq!(json["accumulation"]["indicators"]["fear_greed"]["triggered"], true);
        assert_eq!(json["data_status"]["price_usd"]["status"], "unknown");
    }

    #[test]
    fn document_reloads_from_json() {
        let snap = fixtures::sample_snapshot();
        let text = serde_json::to_string_pretty(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back.cycle_id, snap.cycle_id);
        assert_eq!(back.accumulation.composite.action, "small buy");
    }

    #[test]
    fn history_entry_from_snapshot() {
        let snap = fixtures::sample_snapshot();
        let entry = HistoryEntry::from(&snap);
        assert_eq!(entry.heat_score, 25.0);
        assert_eq!(entry.acc_score, 40.0);
        assert_eq!(entry.price, 50_000.0);
    }
}
