// =============================================================================
// Action tiers and DCA sizing
// =============================================================================
//
// Heat score     tier  action
//   < 30          0    hold
//   < 50          1    sell 20%
//   < 70          2    cumulative 50% sell
//   < 85          3    cumulative 80% sell
//   >= 85         4    full liquidation
//
// Accumulation   tier  action
//   < 30          0    wait
//   < 50          1    small buy
//   < 70          2    aggressive buy
//   >= 70         3    max buy
// =============================================================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeatTier {
    Hold = 0,
    Sell20 = 1,
    Sell50 = 2,
    Sell80 = 3,
    FullLiquidation = 4,
}

impl HeatTier {
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            Self::Hold
        } else if score < 50.0 {
            Self::Sell20
        } else if score < 70.0 {
            Self::Sell50
        } else if score < 85.0 {
            Self::Sell80
        } else {
            Self::FullLiquidation
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn action(self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Sell20 => "sell 20%",
            Self::Sell50 => "cumulative 50% sell",
            Self::Sell80 => "cumulative 80% sell",
            Self::FullLiquidation => "full liquidation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccumulationTier {
    Wait = 0,
    SmallBuy = 1,
    AggressiveBuy = 2,
    MaxBuy = 3,
}

impl AccumulationTier {
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            Self::Wait
        } else if score < 50.0 {
            Self::SmallBuy
        } else if score < 70.0 {
            Self::AggressiveBuy
        } else {
            Self::MaxBuy
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn action(self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::SmallBuy => "small buy",
            Self::AggressiveBuy => "aggressive buy",
            Self::MaxBuy => "max buy",
        }
    }
}

/// Weekly DCA sizing for the accumulation tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcaPolicy {
    /// Base weekly amount in USD for the "small buy" tier.
    pub base_amount: f64,
}

impl DcaPolicy {
    pub fn new(base_amount: f64) -> Self {
        Self { base_amount }
    }

    /// Suggested weekly amount, `None` for the "wait" tier.
    pub fn amount(&self, tier: AccumulationTier, fear_greed: f64) -> Option<f64> {
        let tier_multiplier = match tier {
            AccumulationTier::Wait => return None,
            AccumulationTier::SmallBuy => 1.0,
            AccumulationTier::AggressiveBuy => 1.5,
            AccumulationTier::MaxBuy => 2.0,
        };
        Some(self.base_amount * tier_multiplier * fear_greed_multiplier(fear_greed))
    }
}

impl Default for DcaPolicy {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

/// Deeper fear => larger buys; greed => smaller.
pub fn fear_greed_multiplier(fear_greed: f64) -> f64 {
    if fear_greed < 20.0 {
        1.5
    } else if fear_greed < 40.0 {
        1.2
    } else if fear_greed > 60.0 {
        0.8
    } else {
        1.0
    }
}
