//! Per-speed lookup tables for energy cost and airflow volume

use serde::{Deserialize, Serialize};

use crate::state::{FanSpeed, FAN_SPEED_LEVELS};
use ventilation_rl_core::{RLError, Result};

/// One value per fan speed, slowest first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeedTable([f64; FAN_SPEED_LEVELS]);

impl SpeedTable {
    /// Energy penalty per speed
    pub const ENERGY_COST: SpeedTable = SpeedTable([0.0, 0.2, 0.4, 0.8]);

    /// Fraction of the removal rate each speed achieves
    pub const AIRFLOW_VOLUME: SpeedTable = SpeedTable([0.1, 0.2, 0.5, 1.0]);

    /// Create a table
    #[must_use]
    pub const fn new(values: [f64; FAN_SPEED_LEVELS]) -> Self {
        Self(values)
    }

    /// Value for a raw speed index
    pub fn get(&self, index: usize) -> Result<f64> {
        self.0
            .get(index)
            .copied()
            .ok_or(RLError::OutOfRange { index, len: FAN_SPEED_LEVELS })
    }

    /// Value for a fan speed
    #[must_use]
    pub fn at(&self, speed: FanSpeed) -> f64 {
        self.0[speed.index()]
    }

    /// All values, slowest speed first
    #[must_use]
    pub fn values(&self) -> &[f64; FAN_SPEED_LEVELS] {
        &self.0
    }

    /// Whether each speed costs at least as much as the one below it
    #[must_use]
    pub fn is_non_decreasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] <= w[1])
    }

    /// Whether every entry is finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}
