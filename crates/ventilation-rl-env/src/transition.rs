//! CO2 transition strategies
//!
//! Each strategy computes the state after the fan is commanded to a new speed.
//! The returned state always carries the commanded speed, a CO2 level inside
//! `[CO2_MIN_PPM, CO2_MAX_PPM]` and `co2_diff = new_co2 - previous_co2`.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::actuator::Actuator;
use crate::config::VentilationConfig;
use crate::sensor::{SensorFeed, SensorReading};
use crate::state::{clamp_co2, FanSpeed, VentilationState, CO2_MIN_PPM};
use crate::tables::SpeedTable;
use ventilation_rl_core::Result;

/// Computes the next state from the current one and a commanded speed
pub trait TransitionModel: Send {
    /// Prepare external resources and report the starting CO2 level, if known
    fn initialize(&mut self) -> Result<Option<f64>> {
        Ok(None)
    }

    /// Apply `speed` and return the resulting state
    fn transition(&mut self, state: &VentilationState, speed: FanSpeed) -> Result<VentilationState>;
}

fn settle(state: &VentilationState, speed: FanSpeed, new_co2: f64) -> VentilationState {
    let co2_level = clamp_co2(new_co2);
    VentilationState::new(speed, co2_level, co2_level - state.co2_level)
}

/// Fixed generation minus speed-dependent removal
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTransition {
    generation: f64,
    removal_rate: f64,
    airflow_volume: SpeedTable,
}

impl SimulatedTransition {
    /// Create the strategy from explicit constants
    #[must_use]
    pub fn new(generation: f64, removal_rate: f64, airflow_volume: SpeedTable) -> Self {
        Self { generation, removal_rate, airflow_volume }
    }

    /// Create the strategy from configuration
    #[must_use]
    pub fn from_config(config: &VentilationConfig) -> Self {
        Self::new(config.co2_generation, config.co2_removal_rate, config.airflow_volume)
    }

    /// Unclamped CO2 change per step when running at `speed`
    #[must_use]
    pub fn co2_delta(&self, speed: FanSpeed) -> f64 {
        self.generation - self.airflow_volume.at(speed) * self.removal_rate
    }
}

impl TransitionModel for SimulatedTransition {
    fn transition(
        &mut self,
        state: &VentilationState,
        speed: FanSpeed,
    ) -> Result<VentilationState> {
        Ok(settle(state, speed, state.co2_level + self.co2_delta(speed)))
    }
}

/// CO2 pinned to a baseline; only the speed changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedBaselineTransition {
    baseline: f64,
}

impl FixedBaselineTransition {
    /// Pin CO2 at `baseline` ppm
    #[must_use]
    pub fn new(baseline: f64) -> Self {
        Self { baseline: clamp_co2(baseline) }
    }
}

impl Default for FixedBaselineTransition {
    fn default() -> Self {
        Self::new(CO2_MIN_PPM)
    }
}

impl TransitionModel for FixedBaselineTransition {
    fn initialize(&mut self) -> Result<Option<f64>> {
        Ok(Some(self.baseline))
    }

    fn transition(
        &mut self,
        _state: &VentilationState,
        speed: FanSpeed,
    ) -> Result<VentilationState> {
        Ok(VentilationState::new(speed, self.baseline, 0.0))
    }
}

/// Commands the real fan and waits for the CO2 sensor to report
///
/// Actuator failures and missing readings never fail the step: the commanded
/// speed is assumed applied and the CO2 level is carried forward.
pub struct SensorDrivenTransition {
    actuator: Box<dyn Actuator>,
    feed: Box<dyn SensorFeed>,
    sensor_id: String,
    wait: Duration,
}

impl SensorDrivenTransition {
    /// Create the strategy
    pub fn new(
        actuator: Box<dyn Actuator>,
        feed: Box<dyn SensorFeed>,
        sensor_id: impl Into<String>,
        wait: Duration,
    ) -> Self {
        Self { actuator, feed, sensor_id: sensor_id.into(), wait }
    }

    fn co2_value(&self, reading: &SensorReading) -> Option<f64> {
        if reading.id != self.sensor_id {
            return None;
        }
        if !reading.value.is_finite() {
            warn!(sensor_id = %reading.id, "Ignoring non-finite CO2 reading");
            return None;
        }
        Some(clamp_co2(reading.value))
    }
}

impl TransitionModel for SensorDrivenTransition {
    fn initialize(&mut self) -> Result<Option<f64>> {
        self.feed.clear_filters()?;
        self.feed.install_filter(&self.sensor_id)?;

        info!("Removing any pending sensor data messages from the subscription");
        let stale = self.feed.drain()?;
        let latest = stale.iter().filter_map(|r| self.co2_value(r)).last();
        info!(discarded = stale.len(), latest_co2 = ?latest, "Sensor subscription ready");
        Ok(latest)
    }

    fn transition(
        &mut self,
        state: &VentilationState,
        speed: FanSpeed,
    ) -> Result<VentilationState> {
        info!(fan_speed = speed.level(), "Executing action, setting fan speed");
        if let Err(e) = self.actuator.set_fan_speed(speed) {
            error!(error = %e, fan_speed = speed.level(), "Failed to change ventilation fan speed");
        }

        info!(wait_secs = self.wait.as_secs_f64(), "Waiting for environment to respond to action");
        let co2_level = match self.feed.recv_timeout(self.wait) {
            Ok(Some(reading)) => self.co2_value(&reading),
            Ok(None) => {
                warn!(
                    sensor_id = %self.sensor_id,
                    "No sensor reading before timeout, keeping CO2 level"
                );
                None
            }
            Err(e) => {
                error!(error = %e, "Sensor feed failed, keeping CO2 level");
                None
            }
        };

        Ok(settle(state, speed, co2_level.unwrap_or(state.co2_level)))
    }
}
