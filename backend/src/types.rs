// =============================================================================
// Shared types used across the Cycle Sentinel engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// The two composite score tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Overheated market, consider selling.
    Heat,
    /// Favorable buying conditions.
    Accumulation,
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Heat => write!(f, "heat"),
            Self::Accumulation => write!(f, "accumulation"),
        }
    }
}

/// Every indicator the engine knows how to compute.
///
/// The serde names double as the keys of the weight tables in the runtime
/// config and of the `indicators` maps in the snapshot document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    PiCycleTop,
    Nupl,
    RsiWeekly,
    GoogleTrends,
    KimchiPremium,
    FearGreed,
    ExchangeBalance,
    LongTermHolder,
    HalvingWindow,
}

impl Indicator {
    #[cfg(test)]
    pub const HEAT: [Indicator; 5] = [
        Indicator::PiCycleTop,
        Indicator::Nupl,
        Indicator::RsiWeekly,
        Indicator::GoogleTrends,
        Indicator::KimchiPremium,
    ];

    #[cfg(test)]
    pub const ACCUMULATION: [Indicator; 3] = [
        Indicator::FearGreed,
        Indicator::ExchangeBalance,
        Indicator::LongTermHolder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PiCycleTop => "pi_cycle_top",
            Self::Nupl => "nupl",
            Self::RsiWeekly => "rsi_weekly",
            Self::GoogleTrends => "google_trends",
            Self::KimchiPremium => "kimchi_premium",
            Self::FearGreed => "fear_greed",
            Self::ExchangeBalance => "exchange_balance",
            Self::LongTermHolder => "long_term_holder",
            Self::HalvingWindow => "halving_window",
        }
    }

    /// The score track this indicator feeds.
    pub fn track(self) -> Track {
        match self {
            Self::PiCycleTop
            | Self::Nupl
            | Self::RsiWeekly
            | Self::GoogleTrends
            | Self::KimchiPremium => Track::Heat,
            Self::FearGreed | Self::ExchangeBalance | Self::LongTermHolder | Self::HalvingWindow => {
                Track::Accumulation
            }
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent fetch/compute for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    #[default]
    Unknown,
    Success,
    Error,
}

/// Age classification of a data source's last update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Stale,
    Error,
}
