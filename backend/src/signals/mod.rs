// =============================================================================
// Signals Module
// =============================================================================
//
// Turns indicator results into the two composite tracks:
// - Weighted scoring with halving-cycle contribution
// - Action tiers and DCA sizing

pub mod action_tier;
pub mod weighted_score;

pub use weighted_score::{CompositeScore, ScoreAggregator, ScoringInputs};
