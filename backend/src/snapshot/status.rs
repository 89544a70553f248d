// =============================================================================
// Data Status — per-source outcome and freshness
// =============================================================================
//
// Every upstream fetch and every calculator records its outcome here.  Each
// attempt stamps `last_update`; freshness is derived at read time so that a
// snapshot served long after it was written still reports its true age.
//
//   age < 5 min   => fresh
//   age < 15 min  => stale
//   otherwise     => error   (also when never updated or the last attempt failed)
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Freshness, SourceStatus};

pub const TRACKED_SOURCES: [&str; 12] = [
    "price_usd",
    "price_krw",
    "fx_rate",
    "price_history",
    "pi_cycle",
    "nupl",
    "rsi",
    "google_trends",
    "kimchi_premium",
    "fear_greed",
    "exchange_balance",
    "long_term_holder",
];

const FRESH_MINUTES: i64 = 5;
const STALE_MINUTES: i64 = 15;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub status: SourceStatus,
    pub last_update: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SourceRecord {
    pub fn freshness(&self, now: DateTime<Utc>) -> Freshness {
        if self.status != SourceStatus::Success {
            return Freshness::Error;
        }
        let Some(updated) = self.last_update else {
            return Freshness::Error;
        };
        let age = now - updated;
        if age < Duration::minutes(FRESH_MINUTES) {
            Freshness::Fresh
        } else if age < Duration::minutes(STALE_MINUTES) {
            Freshness::Stale
        } else {
            Freshness::Error
        }
    }
}

/// Source record plus freshness as of the moment it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatusView {
    #[serde(flatten)]
    pub record: SourceRecord,
    pub freshness: Freshness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataStatusTracker {
    records: BTreeMap<String, SourceRecord>,
}

impl Default for DataStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStatusTracker {
    /// All tracked sources, initially `unknown`.
    pub fn new() -> Self {
        Self {
            records: TRACKED_SOURCES
                .iter()
                .map(|name| (name.to_string(), SourceRecord::default()))
                .collect(),
        }
    }

    pub fn record_success(&mut self, source: &str, now: DateTime<Utc>) {
        self.records.insert(
            source.to_string(),
            SourceRecord {
                status: SourceStatus::Success,
                last_update: Some(now),
                error: None,
            },
        );
    }

    pub fn record_error(&mut self, source: &str, error: impl std::fmt::Display, now: DateTime<Utc>) {
        self.records.insert(
            source.to_string(),
            SourceRecord {
                status: SourceStatus::Error,
                last_update: Some(now),
                error: Some(error.to_string()),
            },
        );
    }

    /// Take over the records of a previously rendered view, e.g. from a
    /// snapshot restored at startup.  Untracked names are ignored.
    pub fn restore(&mut self, view: &BTreeMap<String, SourceStatusView>) {
        for (name, entry) in view {
            if let Some(record) = self.records.get_mut(name) {
                *record = entry.record.clone();
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, source: &str) -> Option<&SourceRecord> {
        self.records.get(source)
    }

    /// Records annotated with freshness as of `now`.
    pub fn view(&self, now: DateTime<Utc>) -> BTreeMap<String, SourceStatusView> {
        self.records
            .iter()
            .map(|(name, record)| {
                (
                    name.clone(),
                    SourceStatusView {
                        record: record.clone(),
                        freshness: record.freshness(now),
                    },
                )
            })
            .collect()
    }
}

/// Recompute freshness of an already-rendered status map.
pub fn refresh_freshness(view: &mut BTreeMap<String, SourceStatusView>, now: DateTime<Utc>) {
    for entry in view.values_mut() {
        entry.freshness = entry.record.freshness(now);
    }
}
