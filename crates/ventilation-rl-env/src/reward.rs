//! Reward strategies
//!
//! A reward is an air-quality term (or a constant) minus the energy cost of the
//! new fan speed, minus a churn penalty whenever the speed changes after the
//! first step of an episode.

use serde::{Deserialize, Serialize};

use crate::config::VentilationConfig;
use crate::state::FanSpeed;
use crate::tables::SpeedTable;
use ventilation_rl_core::{RLError, Result, Reward};

/// Scores one transition
///
/// Implementations are pure: the same inputs always give the same reward.
pub trait RewardModel: Send + Sync {
    /// Reward for reaching `co2_level` at `new_speed` coming from
    /// `previous_speed`, on the `step_index`-th step (1-based) of the episode
    fn reward(
        &self,
        co2_level: f64,
        new_speed: FanSpeed,
        previous_speed: FanSpeed,
        step_index: usize,
    ) -> Reward;
}

/// Upper-exclusive CO2 band and its reward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardBand {
    /// Band applies to levels strictly below this, ppm
    pub below: f64,
    /// Reward inside the band
    pub reward: f64,
}

/// Piecewise air-quality reward, looked up by CO2 level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTable {
    /// Bands ordered by increasing threshold
    pub bands: Vec<RewardBand>,
    /// Reward at or above the last threshold
    pub otherwise: f64,
}

impl Default for RewardTable {
    fn default() -> Self {
        let band = |below, reward| RewardBand { below, reward };
        Self {
            bands: vec![
                band(900.0, 1.0),
                band(950.0, 0.9),
                band(1000.0, 0.8),
                band(1200.0, 0.4),
                band(1500.0, -0.2),
            ],
            otherwise: -0.6,
        }
    }
}

impl RewardTable {
    /// Air-quality reward for a CO2 level
    #[must_use]
    pub fn air_quality(&self, co2_level: f64) -> f64 {
        self.bands
            .iter()
            .find(|band| co2_level < band.below)
            .map_or(self.otherwise, |band| band.reward)
    }

    /// Check thresholds increase and rewards decrease band over band
    pub fn validate(&self) -> Result<()> {
        let values_finite = self
            .bands
            .iter()
            .all(|b| b.below.is_finite() && b.reward.is_finite())
            && self.otherwise.is_finite();
        if !values_finite {
            return Err(RLError::Config("reward table values must be finite".to_string()));
        }
        if self.bands.windows(2).any(|w| w[0].below >= w[1].below) {
            return Err(RLError::Config(
                "reward table thresholds must be strictly increasing".to_string(),
            ));
        }
        let rewards: Vec<f64> = self
            .bands
            .iter()
            .map(|b| b.reward)
            .chain(std::iter::once(self.otherwise))
            .collect();
        if rewards.windows(2).any(|w| w[0] <= w[1]) {
            return Err(RLError::Config(
                "reward table rewards must strictly decrease as CO2 rises".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cost and churn terms shared by every reward strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingCost {
    /// Energy penalty per fan speed
    pub energy_cost: SpeedTable,
    /// Penalty for changing fan speed
    pub churn_penalty: f64,
}

impl OperatingCost {
    fn from_config(config: &VentilationConfig) -> Self {
        Self {
            energy_cost: config.energy_cost,
            churn_penalty: config.churn_penalty,
        }
    }

    /// Apply the energy and churn deductions to a base reward
    #[must_use]
    pub fn apply(
        &self,
        base: Reward,
        new_speed: FanSpeed,
        previous_speed: FanSpeed,
        step_index: usize,
    ) -> Reward {
        let mut reward = base - self.energy_cost.at(new_speed);
        // The first step of an episode is exempt: its previous speed came from reset.
        if step_index > 1 && new_speed != previous_speed {
            reward = reward - self.churn_penalty;
        }
        reward
    }
}

/// Air quality minus operating cost (simulated and production variants)
#[derive(Debug, Clone, PartialEq)]
pub struct AirQualityReward {
    table: RewardTable,
    cost: OperatingCost,
}

impl AirQualityReward {
    /// Create the strategy from explicit parts
    #[must_use]
    pub fn new(table: RewardTable, cost: OperatingCost) -> Self {
        Self { table, cost }
    }

    /// Create the strategy from configuration
    #[must_use]
    pub fn from_config(config: &VentilationConfig) -> Self {
        Self::new(config.reward_table.clone(), OperatingCost::from_config(config))
    }
}

impl RewardModel for AirQualityReward {
    fn reward(
        &self,
        co2_level: f64,
        new_speed: FanSpeed,
        previous_speed: FanSpeed,
        step_index: usize,
    ) -> Reward {
        let base = self.table.air_quality(co2_level);
        self.cost.apply(Reward::new(base), new_speed, previous_speed, step_index)
    }
}

/// Constant base minus operating cost (simplified variant)
#[derive(Debug, Clone, PartialEq)]
pub struct CostOnlyReward {
    base: f64,
    cost: OperatingCost,
}

impl CostOnlyReward {
    /// Create the strategy from explicit parts
    #[must_use]
    pub fn new(base: f64, cost: OperatingCost) -> Self {
        Self { base, cost }
    }

    /// Create the strategy from configuration
    #[must_use]
    pub fn from_config(config: &VentilationConfig) -> Self {
        Self::new(config.simplified_base_reward, OperatingCost::from_config(config))
    }
}

impl RewardModel for CostOnlyReward {
    fn reward(
        &self,
        _co2_level: f64,
        new_speed: FanSpeed,
        previous_speed: FanSpeed,
        step_index: usize,
    ) -> Reward {
        self.cost.apply(Reward::new(self.base), new_speed, previous_speed, step_index)
    }
}
