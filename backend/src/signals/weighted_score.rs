// =============================================================================
// Weighted Composite Scorer — heat and accumulation tracks
// =============================================================================
//
// Each track starts from the halving-cycle model's contribution and adds
// `weight · (1 - cycle_weight) · 100` for every triggered indicator listed in
// that track's weight table.  Indicator tables are configured unscaled (each
// sums to 1.0) so indicator weights plus the cycle weight always sum to 1.0.
//
// The accumulation track is boosted ×1.2 while the next halving sits inside
// the configured window.  Both tracks are finally clamped to [0, 100].
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cycle::CycleContribution;
use crate::error::ConfigError;
use crate::indicators::IndicatorResult;
use crate::signals::action_tier::{AccumulationTier, DcaPolicy, HeatTier};
use crate::types::{Indicator, Track};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Indicator name → weight for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable {
    pub weights: BTreeMap<Indicator, f64>,
}

impl WeightTable {
    pub fn from_pairs(pairs: &[(Indicator, f64)]) -> Self {
        Self {
            weights: pairs.iter().copied().collect(),
        }
    }

    pub fn heat_default() -> Self {
        Self::from_pairs(&[
            (Indicator::PiCycleTop, 0.30),
            (Indicator::Nupl, 0.25),
            (Indicator::RsiWeekly, 0.20),
            (Indicator::GoogleTrends, 0.15),
            (Indicator::KimchiPremium, 0.10),
        ])
    }

    pub fn accumulation_default() -> Self {
        Self::from_pairs(&[
            (Indicator::FearGreed, 0.40),
            (Indicator::ExchangeBalance, 0.35),
            (Indicator::LongTermHolder, 0.25),
        ])
    }

    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        self.weights.get(&indicator).copied()
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Every key belongs to `track`, every weight lies in [0, 1] and the
    /// table sums to 1.0.  The halving window acts through its multiplier and
    /// is never weighted.
    pub fn validate(&self, track: Track) -> Result<(), ConfigError> {
        if let Some(&indicator) = self
            .weights
            .keys()
            .find(|i| i.track() != track || **i == Indicator::HalvingWindow)
        {
            return Err(ConfigError::MisplacedIndicator { track, indicator });
        }

        let sum = self.sum();
        let in_range = self.weights.values().all(|w| (0.0..=1.0).contains(w));
        if !in_range || (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidWeights { track, sum });
        }
        Ok(())
    }
}

/// Composite score for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub score: f64,
    pub level: u8,
    pub action: String,
    /// Suggested weekly DCA amount (accumulation track only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dca_amount: Option<f64>,
    pub contributions: Vec<Contribution>,
}

/// Points added to a track by one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub source: String,
    pub points: f64,
}

/// Everything the aggregator consumes for one refresh cycle.
#[derive(Debug, Clone)]
pub struct ScoringInputs<'a> {
    pub heat: &'a [IndicatorResult],
    pub accumulation: &'a [IndicatorResult],
    pub cycle: CycleContribution,
    pub halving_window: bool,
    pub fear_greed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub heat: CompositeScore,
    pub accumulation: CompositeScore,
}

/// The main weighted scoring engine.
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    heat_weights: WeightTable,
    accumulation_weights: WeightTable,
    cycle_weight: f64,
    halving_window_multiplier: f64,
    dca: DcaPolicy,
}

impl ScoreAggregator {
    pub fn new(
        heat_weights: WeightTable,
        accumulation_weights: WeightTable,
        cycle_weight: f64,
        halving_window_multiplier: f64,
        dca: DcaPolicy,
    ) -> Result<Self, ConfigError> {
        heat_weights.validate(Track::Heat)?;
        accumulation_weights.validate(Track::Accumulation)?;
        if !(0.0..1.0).contains(&cycle_weight) {
            return Err(ConfigError::InvalidCycleWeight(cycle_weight));
        }
        Ok(Self {
            heat_weights,
            accumulation_weights,
            cycle_weight,
            halving_window_multiplier,
            dca,
        })
    }

    pub fn cycle_weight(&self) -> f64 {
        self.cycle_weight
    }

    /// Score both tracks and map them to action tiers.
    pub fn aggregate(&self, inputs: &ScoringInputs<'_>) -> ScoreBreakdown {
        let (heat_raw, heat_parts) = self.raw_score(Track::Heat, inputs.heat, inputs.cycle.heat);
        let heat_score = clamp_score(heat_raw);
        let heat_tier = HeatTier::from_score(heat_score);

        let (mut acc_raw, acc_parts) = self.raw_score(
            Track::Accumulation,
            inputs.accumulation,
            inputs.cycle.accumulation,
        );
        if inputs.halving_window {
            acc_raw *= self.halving_window_multiplier;
        }
        let acc_score = clamp_score(acc_raw);
        let acc_tier = AccumulationTier::from_score(acc_score);

        ScoreBreakdown {
            heat: CompositeScore {
                score: heat_score,
                level: heat_tier.level(),
                action: heat_tier.action().to_string(),
                dca_amount: None,
                contributions: heat_parts,
            },
            accumulation: CompositeScore {
                score: acc_score,
                level: acc_tier.level(),
                action: acc_tier.action().to_string(),
                dca_amount: self.dca.amount(acc_tier, inputs.fear_greed),
                contributions: acc_parts,
            },
        }
    }

    fn raw_score(
        &self,
        track: Track,
        results: &[IndicatorResult],
        cycle_points: f64,
    ) -> (f64, Vec<Contribution>) {
        let table = match track {
            Track::Heat => &self.heat_weights,
            Track::Accumulation => &self.accumulation_weights,
        };
        let scale = (1.0 - self.cycle_weight) * 100.0;

        let mut contributions = Vec::with_capacity(results.len() + 1);
        let mut total = cycle_points;
        if cycle_points != 0.0 {
            contributions.push(Contribution {
                source: "halving_cycle".to_string(),
                points: cycle_points,
            });
        }

        for result in results.iter().filter(|r| r.triggered) {
            let Some(weight) = table.get(result.name) else {
                continue;
            };
            let points = weight * scale;
            total += points;
            contributions.push(Contribution {
                source: result.name.as_str().to_string(),
                points,
            });
        }

        (total, contributions)
    }
}

fn clamp_score(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
