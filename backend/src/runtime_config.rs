// =============================================================================
// Runtime Configuration — scoring weights, schedule and polling cadence
// =============================================================================
//
// Every tunable parameter of the sentinel lives here.  All fields carry a
// serde default so that older JSON files missing new fields still load.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  `validate()` must pass before the engine starts; a failure is fatal.
// =============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cycle::HalvingSchedule;
use crate::error::ConfigError;
use crate::signals::action_tier::DcaPolicy;
use crate::signals::weighted_score::{ScoreAggregator, WeightTable};
use crate::types::Track;

pub const DEFAULT_CONFIG_PATH: &str = "cycle_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_heat_weights() -> WeightTable {
    WeightTable::heat_default()
}

fn default_accumulation_weights() -> WeightTable {
    WeightTable::accumulation_default()
}

fn default_cycle_weight() -> f64 {
    0.30
}

fn default_halving_window_multiplier() -> f64 {
    1.2
}

fn default_halving_window_months() -> HalvingWindowMonths {
    HalvingWindowMonths { min: 6.0, max: 18.0 }
}

fn default_snapshot_refresh_secs() -> u64 {
    300
}

fn default_history_cache_secs() -> u64 {
    1800
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_source_min_interval_secs() -> BTreeMap<String, u64> {
    [("coingecko", 10), ("google_trends", 60), ("alternative_me", 10)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn default_dca_base_amount() -> f64 {
    1000.0
}

fn default_fallback_fx_rate() -> f64 {
    1350.0
}

fn default_snapshot_path() -> String {
    "dashboard_data.json".to_string()
}

fn default_history_capacity() -> usize {
    100
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

/// Inclusive bounds, in months to the next halving, of the accumulation boost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HalvingWindowMonths {
    pub min: f64,
    pub max: f64,
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Scoring -------------------------------------------------------------

    /// Heat-track indicator weights (unscaled, sums to 1.0).
    #[serde(default = "default_heat_weights")]
    pub heat_weights: WeightTable,

    /// Accumulation-track indicator weights (unscaled, sums to 1.0).
    #[serde(default = "default_accumulation_weights")]
    pub accumulation_weights: WeightTable,

    /// Share of each track owned by the halving-cycle model, in [0, 1).
    /// 0 disables the cycle model entirely.
    #[serde(default = "default_cycle_weight")]
    pub cycle_weight: f64,

    #[serde(default = "default_halving_window_multiplier")]
    pub halving_window_multiplier: f64,

    #[serde(default = "default_halving_window_months")]
    pub halving_window_months: HalvingWindowMonths,

    #[serde(default)]
    pub halving_schedule: HalvingSchedule,

    // --- Cadence -------------------------------------------------------------

    #[serde(default = "default_snapshot_refresh_secs")]
    pub snapshot_refresh_secs: u64,

    /// How long the daily price history is reused before refetching.
    #[serde(default = "default_history_cache_secs")]
    pub history_cache_secs: u64,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Minimum seconds between two calls to the same upstream source.
    #[serde(default = "default_source_min_interval_secs")]
    pub source_min_interval_secs: BTreeMap<String, u64>,

    // --- Actions & fallbacks -------------------------------------------------

    /// Weekly DCA base amount in USD.
    #[serde(default = "default_dca_base_amount")]
    pub dca_base_amount: f64,

    /// USD/KRW rate used when the FX source is down.
    #[serde(default = "default_fallback_fx_rate")]
    pub fallback_fx_rate: f64,

    // --- Serving & persistence -----------------------------------------------

    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Optional webhook receiving alert events as JSON.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            heat_weights: default_heat_weights(),
            accumulation_weights: default_accumulation_weights(),
            cycle_weight: default_cycle_weight(),
            halving_window_multiplier: default_halving_window_multiplier(),
            halving_window_months: default_halving_window_months(),
            halving_schedule: HalvingSchedule::default(),
            snapshot_refresh_secs: default_snapshot_refresh_secs(),
            history_cache_secs: default_history_cache_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            source_min_interval_secs: default_source_min_interval_secs(),
            dca_base_amount: default_dca_base_amount(),
            fallback_fx_rate: default_fallback_fx_rate(),
            snapshot_path: default_snapshot_path(),
            history_capacity: default_history_capacity(),
            bind_addr: default_bind_addr(),
            webhook_url: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            cycle_weight = config.cycle_weight,
            refresh_secs = config.snapshot_refresh_secs,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Load from `path`, or fall back to defaults when the file is missing.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "runtime config not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `SENTINEL_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("SENTINEL_BIND_ADDR") {
            self.bind_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            self.bind_addr = format!("0.0.0.0:{port}");
        }
        if let Some(path) = lookup("SENTINEL_SNAPSHOT_PATH") {
            self.snapshot_path = path;
        }
        if let Some(url) = lookup("SENTINEL_WEBHOOK_URL").filter(|u| !u.is_empty()) {
            self.webhook_url = Some(url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.heat_weights.validate(Track::Heat)?;
        self.accumulation_weights.validate(Track::Accumulation)?;
        if !(0.0..1.0).contains(&self.cycle_weight) {
            return Err(ConfigError::InvalidCycleWeight(self.cycle_weight));
        }
        self.halving_schedule.validate()?;

        if self.snapshot_refresh_secs == 0 {
            return Err(ConfigError::InvalidInterval("snapshot_refresh_secs"));
        }
        if self.history_cache_secs == 0 {
            return Err(ConfigError::InvalidInterval("history_cache_secs"));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidInterval("http_timeout_secs"));
        }
        if self.source_min_interval_secs.values().any(|s| *s == 0) {
            return Err(ConfigError::InvalidInterval("source_min_interval_secs"));
        }
        let window = self.halving_window_months;
        if !(window.min >= 0.0 && window.min <= window.max) {
            return Err(ConfigError::InvalidInterval("halving_window_months"));
        }

        for (name, value) in [
            ("halving_window_multiplier", self.halving_window_multiplier),
            ("dca_base_amount", self.dca_base_amount),
            ("fallback_fx_rate", self.fallback_fx_rate),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidAmount { name, value });
            }
        }
        Ok(())
    }

    /// Build the scoring engine from the configured tables.
    pub fn score_aggregator(&self) -> Result<ScoreAggregator, ConfigError> {
        ScoreAggregator::new(
            self.heat_weights.clone(),
            self.accumulation_weights.clone(),
            self.cycle_weight,
            self.halving_window_multiplier,
            DcaPolicy::new(self.dca_base_amount),
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_refresh_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Indicator;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert!(cfg.validate().is_ok());
        assert!((cfg.cycle_weight - 0.30).abs() < f64::EPSILON);
        assert_eq!(cfg.heat_weights.get(Indicator::PiCycleTop), Some(0.30));
        assert_eq!(cfg.accumulation_weights.get(Indicator::FearGreed), Some(0.40));
        assert_eq!(cfg.snapshot_refresh_secs, 300);
        assert_eq!(cfg.history_capacity, 100);
        assert_eq!(cfg.source_min_interval_secs.get("google_trends"), Some(&60));
        assert_eq!(cfg.source_min_interval_secs.get("bithumb"), None);
        assert_eq!(cfg.bind_addr, "0.0.0.0:5000");
        assert!(cfg.webhook_url.is_none());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.halving_schedule.epochs().len(), 5);
        assert_eq!(cfg.snapshot_path, "dashboard_data.json");
        assert!((cfg.fallback_fx_rate - 1350.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "cycle_weight": 0.0, "accumulation_weights": {
            "fear_greed": 0.5, "exchange_balance": 0.3, "long_term_holder": 0.2 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.cycle_weight, 0.0);
        assert_eq!(cfg.accumulation_weights.get(Indicator::FearGreed), Some(0.5));
        assert_eq!(cfg.heat_weights, WeightTable::heat_default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = RuntimeConfig::default();
        cfg.heat_weights = WeightTable::from_pairs(&[(Indicator::Nupl, 0.9)]);
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidWeights { track: Track::Heat, .. })));

        let mut cfg = RuntimeConfig::default();
        cfg.cycle_weight = 1.0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidCycleWeight(1.0)));

        let mut cfg = RuntimeConfig::default();
        cfg.snapshot_refresh_secs = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidInterval("snapshot_refresh_secs"))
        );

        let cfg: RuntimeConfig = serde_json::from_str(r#"{ "halving_schedule": [] }"#).unwrap();
        assert_eq!(cfg.validate(), Err(ConfigError::EmptySchedule));
    }

    #[test]
    fn validate_rejects_cross_track_weights() {
        let mut cfg = RuntimeConfig::default();
        cfg.heat_weights = WeightTable::from_pairs(&[(Indicator::FearGreed, 1.0)]);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MisplacedIndicator {
                track: Track::Heat,
                indicator: Indicator::FearGreed,
            })
        );

        let json = r#"{ "accumulation_weights": { "fear_greed": 0.5, "halving_window": 0.5 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MisplacedIndicator { indicator: Indicator::HalvingWindow, .. })
        ));
    }

    #[test]
    fn validate_rejects_non_positive_amounts() {
        let mut cfg = RuntimeConfig::default();
        cfg.halving_window_multiplier = -1.2;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidAmount { name: "halving_window_multiplier", .. })
        ));

        let mut cfg = RuntimeConfig::default();
        cfg.dca_base_amount = f64::NAN;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidAmount { name: "dca_base_amount", .. })
        ));

        let mut cfg = RuntimeConfig::default();
        cfg.fallback_fx_rate = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidAmount { name: "fallback_fx_rate", .. })
        ));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_overrides(|key| match key {
            "PORT" => Some("8080".to_string()),
            "SENTINEL_SNAPSHOT_PATH" => Some("/tmp/snap.json".to_string()),
            "SENTINEL_WEBHOOK_URL" => Some("http://hook.local/alerts".to_string()),
            _ => None,
        });
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.snapshot_path, "/tmp/snap.json");
        assert_eq!(cfg.webhook_url.as_deref(), Some("http://hook.local/alerts"));

        cfg.apply_overrides(|key| (key == "SENTINEL_BIND_ADDR").then(|| "127.0.0.1:9000".to_string()));
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = std::env::temp_dir().join(format!("sentinel-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cycle_config.json");

        let mut cfg = RuntimeConfig::default();
        cfg.dca_base_amount = 250.0;
        cfg.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.dca_base_amount, 250.0);
        assert_eq!(loaded.halving_schedule, cfg.halving_schedule);

        let missing = RuntimeConfig::load_or_default(dir.join("absent.json")).unwrap();
        assert_eq!(missing.snapshot_refresh_secs, 300);
        std::fs::remove_dir_all(&dir).ok();
    }
}
