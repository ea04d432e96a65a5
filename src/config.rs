//! Arena configuration
//!
//! Persisted as JSON. Every field has a default, so partial files load.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::{BoostPadConfig, MutatorConfig};

/// Memory/speed trade-off; never changes simulation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MemWeightMode {
    /// Keep a spatial grid over the boost pads
    #[default]
    Heavy,
    /// Scan the pads linearly; smaller and faster to clone
    Light,
}

impl MemWeightMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemWeightMode::Heavy => "Heavy",
            MemWeightMode::Light => "Light",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "heavy" => Some(MemWeightMode::Heavy),
            "light" => Some(MemWeightMode::Light),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArenaConfig {
    pub mem_weight_mode: MemWeightMode,
    /// Replaces the stock layout when non-empty
    pub custom_boost_pads: Vec<BoostPadConfig>,
    /// Seeds respawns and unseeded kickoffs
    pub rng_seed: u64,
    /// Overrides the game mode's stock rules
    pub mutator: Option<MutatorConfig>,
}

impl ArenaConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded arena config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Arena config saved to {}", path.display());
        Ok(())
    }
}
