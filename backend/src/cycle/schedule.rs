// =============================================================================
// Halving epoch schedule
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One supply-halving epoch.  Dates after the last observed halving are
/// projections and carry `projected = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalvingEpoch {
    pub number: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub projected: bool,
}

impl HalvingEpoch {
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

/// Ordered list of halving epochs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HalvingSchedule {
    epochs: Vec<HalvingEpoch>,
}

impl HalvingSchedule {
    /// Build a schedule, rejecting empty or non-ascending input.
    #[cfg(test)]
    pub fn new(epochs: Vec<HalvingEpoch>) -> Result<Self, ConfigError> {
        let schedule = Self { epochs };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        for pair in self.epochs.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ConfigError::UnorderedSchedule(pair[1].number));
            }
        }
        Ok(())
    }

    pub fn epochs(&self) -> &[HalvingEpoch] {
        &self.epochs
    }

    /// `(latest epoch <= now, first epoch > now)`.
    pub fn locate(&self, now: DateTime<Utc>) -> (Option<&HalvingEpoch>, Option<&HalvingEpoch>) {
        let split = self.epochs.partition_point(|e| e.starts_at() <= now);
        let current = split.checked_sub(1).and_then(|i| self.epochs.get(i));
        (current, self.epochs.get(split))
    }
}

impl Default for HalvingSchedule {
    fn default() -> Self {
        let epoch = |number, y, m, d, projected| HalvingEpoch {
            number,
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
            projected,
        };
        Self {
            epochs: vec![
                epoch(1, 2012, 11, 28, false),
                epoch(2, 2016, 7, 9, false),
                epoch(3, 2020, 5, 11, false),
                epoch(4, 2024, 4, 20, false),
                epoch(5, 2028, 4, 20, true),
            ],
        }
    }
}
