// =============================================================================
// Error taxonomy
// =============================================================================
//
// Upstream fetch failures and insufficient history are absorbed by the
// pipeline (defaulted + logged); configuration errors abort startup;
// persistence errors keep the previous snapshot in service.
// =============================================================================

use thiserror::Error;

use crate::types::{Indicator, Track};

/// Failure fetching or decoding a value from an external data source.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{source_name}: request failed: {message}")]
    Http {
        source_name: &'static str,
        message: String,
    },

    #[error("{source_name}: upstream returned HTTP {status}")]
    Status {
        source_name: &'static str,
        status: u16,
    },

    #[error("{source_name}: unexpected payload: {message}")]
    Parse {
        source_name: &'static str,
        message: String,
    },

    #[error("{source_name}: upstream returned no data")]
    Empty { source_name: &'static str },

    #[error("all sources failed for {signal}: {last}")]
    AllSourcesFailed {
        signal: &'static str,
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn parse(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name,
            message: message.into(),
        }
    }
}

/// Invalid weighting or epoch configuration. Fatal at startup.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{track} weights must lie in [0, 1] and sum to 1.0 (got sum {sum:.4})")]
    InvalidWeights { track: Track, sum: f64 },

    #[error("{indicator} cannot carry a weight on the {track} track")]
    MisplacedIndicator { track: Track, indicator: Indicator },

    #[error("{name} must be finite and greater than zero (got {value})")]
    InvalidAmount { name: &'static str, value: f64 },

    #[error("cycle weight must lie in [0, 1) (got {0})")]
    InvalidCycleWeight(f64),

    #[error("halving schedule is empty")]
    EmptySchedule,

    #[error("halving schedule must be strictly ascending (epoch #{0} is out of order)")]
    UnorderedSchedule(u32),

    #[error("{0} must be greater than zero")]
    InvalidInterval(&'static str),
}

/// Snapshot write failure.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to serialise snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write snapshot to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
