// =============================================================================
// Halving Cycle Phase Model
// =============================================================================
//
// Maps "months since the last halving" onto a named market phase and a signed
// phase score in [-100, 100].  Negative scores are sell pressure and feed the
// heat track; non-negative scores feed the accumulation track.
//
//   months since   phase              score
//   ------------   ----------------   -----
//   <= 0           accumulation         80   (next halving <= 12 months away)
//   <= 0           pre-accumulation     40
//   (0, 6]         early-bull           20
//   (6, 12]        mid-bull             10
//   (12, 18]       late-bull           -60
//   (18, 24]       distribution        -80
//   (24, 36]       bear                -40
//   > 36           late-bear            60
//
// A month is 30 days; day counts are whole days.
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::schedule::HalvingSchedule;

const DAYS_PER_MONTH: f64 = 30.0;
const CYCLE_MONTHS: f64 = 48.0;
const ACCUMULATION_LEAD_MONTHS: f64 = 12.0;

/// Named position inside the four-year halving cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CyclePhase {
    PreAccumulation,
    Accumulation,
    EarlyBull,
    MidBull,
    LateBull,
    Distribution,
    Bear,
    LateBear,
}

impl CyclePhase {
    /// Signed phase score in [-100, 100].
    pub fn score(self) -> f64 {
        match self {
            Self::Accumulation => 80.0,
            Self::PreAccumulation => 40.0,
            Self::EarlyBull => 20.0,
            Self::MidBull => 10.0,
            Self::LateBull => -60.0,
            Self::Distribution => -80.0,
            Self::Bear => -40.0,
            Self::LateBear => 60.0,
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Self::PreAccumulation => "preparation stage, build cash reserves",
            Self::Accumulation => "accumulation phase, aggressive DCA buying",
            Self::EarlyBull => "early bull market, hold and add selectively",
            Self::MidBull => "mid bull market, hold and stop adding",
            Self::LateBull => "late bull market, begin staged selling (10-20% per month)",
            Self::Distribution => "distribution phase, sell aggressively and liquidate remaining position",
            Self::Bear => "bear market, hold cash until the next accumulation phase",
            Self::LateBear => "late bear market, prepare to buy",
        }
    }

    /// Coarse stance across both tracks.
    pub fn stance(self) -> CycleStance {
        match self {
            Self::LateBull | Self::Distribution => CycleStance::SellFirst,
            Self::Accumulation | Self::LateBear => CycleStance::BuyFirst,
            Self::EarlyBull | Self::MidBull => CycleStance::Hold,
            Self::PreAccumulation | Self::Bear => CycleStance::Observe,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreAccumulation => "pre-accumulation",
            Self::Accumulation => "accumulation",
            Self::EarlyBull => "early-bull",
            Self::MidBull => "mid-bull",
            Self::LateBull => "late-bull",
            Self::Distribution => "distribution",
            Self::Bear => "bear",
            Self::LateBear => "late-bear",
        }
    }
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStance {
    SellFirst,
    BuyFirst,
    Hold,
    Observe,
}

/// Where we are in the halving cycle right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleInfo {
    pub phase: CyclePhase,
    pub months_since_halving: f64,
    pub months_to_next_halving: f64,
    pub cycle_position_pct: f64,
    pub phase_score: f64,
    /// Number of the latest halving at or before now (0 if none).
    pub halving_number: u32,
    pub next_halving: Option<NaiveDate>,
    /// `true` when `next_halving` is a projection rather than history.
    pub next_halving_estimated: bool,
}

/// The cycle model's share of each composite score, already scaled by the
/// cycle weight (points out of 100).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CycleContribution {
    pub heat: f64,
    pub accumulation: f64,
}

impl CycleInfo {
    /// Evaluate the cycle position of `now` against `schedule`.
    pub fn evaluate(schedule: &HalvingSchedule, now: DateTime<Utc>) -> Self {
        let (current, next) = schedule.locate(now);

        let months_to_next = next
            .map(|e| whole_days(e.starts_at() - now) / DAYS_PER_MONTH)
            .unwrap_or(0.0);
        let next_halving = next.map(|e| e.date);
        let next_halving_estimated = next.is_some_and(|e| e.projected);

        let Some(current) = current else {
            let phase = CyclePhase::PreAccumulation;
            return Self {
                phase,
                months_since_halving: 0.0,
                months_to_next_halving: months_to_next,
                cycle_position_pct: 0.0,
                phase_score: phase.score(),
                halving_number: 0,
                next_halving,
                next_halving_estimated,
            };
        };

        let months_since = whole_days(now - current.starts_at()) / DAYS_PER_MONTH;
        let phase = phase_for(months_since, months_to_next);

        Self {
            phase,
            months_since_halving: months_since,
            months_to_next_halving: months_to_next,
            cycle_position_pct: months_since / CYCLE_MONTHS * 100.0,
            phase_score: phase.score(),
            halving_number: current.number,
            next_halving,
            next_halving_estimated,
        }
    }

    /// Split the phase score into heat / accumulation points.
    ///
    /// Negative scores contribute `|score|·weight` to heat, non-negative scores
    /// contribute `score·weight` to accumulation.  The other side gets 0.
    pub fn contribution(&self, cycle_weight: f64) -> CycleContribution {
        if self.phase_score < 0.0 {
            CycleContribution {
                heat: self.phase_score.abs() * cycle_weight,
                accumulation: 0.0,
            }
        } else {
            CycleContribution {
                heat: 0.0,
                accumulation: self.phase_score * cycle_weight,
            }
        }
    }

    /// Next halving lies inside `[min_months, max_months]`.
    pub fn in_halving_window(&self, min_months: f64, max_months: f64) -> bool {
        self.next_halving.is_some()
            && self.months_to_next_halving >= min_months
            && self.months_to_next_halving <= max_months
    }
}

fn phase_for(months_since: f64, months_to_next: f64) -> CyclePhase {
    if months_since <= 0.0 {
        if months_to_next <= ACCUMULATION_LEAD_MONTHS {
            CyclePhase::Accumulation
        } else {
            CyclePhase::PreAccumulation
        }
    } else if months_since <= 6.0 {
        CyclePhase::EarlyBull
    } else if months_since <= 12.0 {
        CyclePhase::MidBull
    } else if months_since <= 18.0 {
        CyclePhase::LateBull
    } else if months_since <= 24.0 {
        CyclePhase::Distribution
    } else if months_since <= 36.0 {
        CyclePhase::Bear
    } else {
        CyclePhase::LateBear
    }
}

fn whole_days(delta: chrono::Duration) -> f64 {
    delta.num_days() as f64
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::schedule::HalvingEpoch;
    use chrono::{Duration, TimeZone};

    fn halving4() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, 0, 0, 0).unwrap()
    }

    fn days_after_h4(days: i64) -> CycleInfo {
        CycleInfo::evaluate(&HalvingSchedule::default(), halving4() + Duration::days(days))
    }

    #[test]
    fn phase_table() {
        assert_eq!(days_after_h4(30).phase, CyclePhase::EarlyBull);
        assert_eq!(days_after_h4(180).phase, CyclePhase::EarlyBull);
        assert_eq!(days_after_h4(181).phase, CyclePhase::MidBull);
        assert_eq!(days_after_h4(360).phase, CyclePhase::MidBull);
        assert_eq!(days_after_h4(400).phase, CyclePhase::LateBull);
        assert_eq!(days_after_h4(600).phase, CyclePhase::Distribution);
        assert_eq!(days_after_h4(900).phase, CyclePhase::Bear);
        assert_eq!(days_after_h4(1200).phase, CyclePhase::LateBear);
    }

    #[test]
    fn halving_day_close_to_next_is_accumulation() {
        // Two epochs 300 days apart: on the first halving day the next one is
        // 10 months away.
        let d = |y, m, dd| NaiveDate::from_ymd_opt(y, m, dd).unwrap();
        let schedule = HalvingSchedule::new(vec![
            HalvingEpoch { number: 1, date: d(2030, 1, 1), projected: false },
            HalvingEpoch { number: 2, date: d(2030, 10, 28), projected: true },
        ])
        .unwrap();
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 6, 0, 0).unwrap();
        let info = CycleInfo::evaluate(&schedule, now);
        assert_eq!(info.months_since_halving, 0.0);
        assert_eq!(info.phase, CyclePhase::Accumulation);
        assert_eq!(info.phase_score, 80.0);
    }

    #[test]
    fn halving_day_far_from_next_is_pre_accumulation() {
        let info = CycleInfo::evaluate(&HalvingSchedule::default(), halving4());
        assert_eq!(info.phase, CyclePhase::PreAccumulation);
        assert_eq!(info.phase_score, 40.0);
    }

    #[test]
    fn before_first_epoch_is_pre_accumulation() {
        let now = Utc.with_ymd_and_hms(2011, 11, 28, 0, 0, 0).unwrap();
        let info = CycleInfo::evaluate(&HalvingSchedule::default(), now);
        assert_eq!(info.phase, CyclePhase::PreAccumulation);
        assert_eq!(info.halving_number, 0);
        assert_eq!(info.months_since_halving, 0.0);
        assert!((info.months_to_next_halving - 366.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn after_last_epoch_has_no_next() {
        let now = Utc.with_ymd_and_hms(2033, 1, 1, 0, 0, 0).unwrap();
        let info = CycleInfo::evaluate(&HalvingSchedule::default(), now);
        assert_eq!(info.months_to_next_halving, 0.0);
        assert!(info.next_halving.is_none());
        assert!(!info.next_halving_estimated);
        assert!(!info.in_halving_window(6.0, 18.0));
    }

    #[test]
    fn next_projected_halving_is_marked_estimated() {
        let info = days_after_h4(100);
        assert_eq!(info.halving_number, 4);
        assert_eq!(info.next_halving, NaiveDate::from_ymd_opt(2028, 4, 20));
        assert!(info.next_halving_estimated);
    }

    #[test]
    fn months_since_is_monotonic() {
        let schedule = HalvingSchedule::default();
        let start = Utc.with_ymd_and_hms(2024, 4, 20, 0, 0, 0).unwrap();
        let mut prev = f64::MIN;
        for step in 0..400 {
            let info = CycleInfo::evaluate(&schedule, start + Duration::hours(step * 61));
            assert!(info.months_since_halving >= prev);
            prev = info.months_since_halving;
        }
    }

    #[test]
    fn contribution_split() {
        let mut info = days_after_h4(600); // distribution, -80
        let c = info.contribution(0.30);
        assert!((c.heat - 24.0).abs() < 1e-9);
        assert_eq!(c.accumulation, 0.0);

        info = days_after_h4(1200); // late-bear, 60
        let c = info.contribution(0.30);
        assert_eq!(c.heat, 0.0);
        assert!((c.accumulation - 18.0).abs() < 1e-9);
    }

    #[test]
    fn cycle_position_pct() {
        let info = days_after_h4(720);
        assert!((info.cycle_position_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn halving_window_bounds() {
        // 2028-04-20 minus 365 days => ~12.2 months away.
        let now = Utc.with_ymd_and_hms(2027, 4, 21, 0, 0, 0).unwrap();
        let info = CycleInfo::evaluate(&HalvingSchedule::default(), now);
        assert!(info.in_halving_window(6.0, 18.0));
        assert!(!info.in_halving_window(13.0, 18.0));
    }

    #[test]
    fn phase_serialises_kebab_case() {
        let json = serde_json::to_string(&CyclePhase::PreAccumulation).unwrap();
        assert_eq!(json, "\"pre-accumulation\"");
        assert_eq!(CyclePhase::LateBear.to_string(), "late-bear");
    }

    #[test]
    fn stance_groups() {
        assert_eq!(CyclePhase::Distribution.stance(), CycleStance::SellFirst);
        assert_eq!(CyclePhase::LateBear.stance(), CycleStance::BuyFirst);
        assert_eq!(CyclePhase::MidBull.stance(), CycleStance::Hold);
        assert_eq!(CyclePhase::Bear.stance(), CycleStance::Observe);
    }
}
