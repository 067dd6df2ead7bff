//! Engine configuration with documented constants
//!
//! Every tunable of the conflict engine lives here. Components receive a
//! config explicitly at construction; there is no global instance.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::error::{FrontlineError, Result};

/// Configuration for the conflict engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === POLLER ===
    /// Seconds between completion poller cycles
    ///
    /// Bounds the latency between an order maturing and being resolved.
    /// It is not a correctness parameter.
    pub poll_interval_secs: u64,

    // === TRAVEL ===
    /// Distance (km) assumed when either territory center is unknown
    pub nominal_distance_km: f64,

    // === SUPPLY ===
    /// Distance (km) at which the supply penalty would reach 100%
    ///
    /// At 10000 km a 1000 km march costs 10% of attack power.
    pub supply_penalty_divisor_km: f64,

    /// Maximum fraction of attack power lost to supply lines
    pub supply_penalty_cap: f64,

    // === LOSSES ===
    /// Base loss rate for the winning side
    pub winner_loss_rate: f64,

    /// Base loss rate for the losing side
    pub loser_loss_rate: f64,

    /// Lower bound (inclusive) of the per-unit-type random loss multiplier
    pub loss_multiplier_min: f64,

    /// Upper bound (exclusive) of the per-unit-type random loss multiplier
    pub loss_multiplier_max: f64,

    // === INFRASTRUCTURE ===
    /// Percent damage dealt per point of attack/defense power ratio
    pub infrastructure_damage_per_ratio: f64,

    /// Maximum percent damage a single attack can deal to one facility
    pub infrastructure_damage_cap: f64,

    // === RANDOMNESS ===
    /// Seed for the battle RNG. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            nominal_distance_km: 100.0,
            supply_penalty_divisor_km: 10_000.0,
            supply_penalty_cap: 0.5,
            winner_loss_rate: 0.3,
            loser_loss_rate: 0.7,
            loss_multiplier_min: 0.5,
            loss_multiplier_max: 1.0,
            infrastructure_damage_per_ratio: 20.0,
            infrastructure_damage_cap: 50.0,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Parse a (possibly partial) TOML document; missing keys keep defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("nominal_distance_km", self.nominal_distance_km),
            ("supply_penalty_divisor_km", self.supply_penalty_divisor_km),
            ("supply_penalty_cap", self.supply_penalty_cap),
            ("winner_loss_rate", self.winner_loss_rate),
            ("loser_loss_rate", self.loser_loss_rate),
            ("loss_multiplier_min", self.loss_multiplier_min),
            ("loss_multiplier_max", self.loss_multiplier_max),
            ("infrastructure_damage_per_ratio", self.infrastructure_damage_per_ratio),
            ("infrastructure_damage_cap", self.infrastructure_damage_cap),
        ] {
            if !value.is_finite() {
                return Err(FrontlineError::Config(format!(
                    "{} ({}) must be finite",
                    name, value
                )));
            }
        }

        if self.poll_interval_secs == 0 {
            return Err(FrontlineError::Config(
                "poll_interval_secs must be positive".into(),
            ));
        }

        if self.nominal_distance_km < 0.0 {
            return Err(FrontlineError::Config(format!(
                "nominal_distance_km ({}) must not be negative",
                self.nominal_distance_km
            )));
        }

        if self.supply_penalty_divisor_km <= 0.0 {
            return Err(FrontlineError::Config(format!(
                "supply_penalty_divisor_km ({}) must be positive",
                self.supply_penalty_divisor_km
            )));
        }

        for (name, value) in [
            ("supply_penalty_cap", self.supply_penalty_cap),
            ("winner_loss_rate", self.winner_loss_rate),
            ("loser_loss_rate", self.loser_loss_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FrontlineError::Config(format!(
                    "{} ({}) must be within [0, 1]",
                    name, value
                )));
            }
        }

        // Multiplier range is sampled half-open, so it must be non-empty
        if self.loss_multiplier_min < 0.0
            || self.loss_multiplier_max > 1.0
            || self.loss_multiplier_min >= self.loss_multiplier_max
        {
            return Err(FrontlineError::Config(format!(
                "loss multiplier range [{}, {}) must be non-empty and within [0, 1]",
                self.loss_multiplier_min, self.loss_multiplier_max
            )));
        }

        if self.infrastructure_damage_cap < 0.0 || self.infrastructure_damage_cap > 100.0 {
            return Err(FrontlineError::Config(format!(
                "infrastructure_damage_cap ({}) must be a percentage",
                self.infrastructure_damage_cap
            )));
        }

        Ok(())
    }
}
