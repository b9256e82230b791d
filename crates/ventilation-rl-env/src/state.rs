//! Ventilation state, fan speeds and the observation space

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

use ventilation_rl_core::{
    BoxObservationSpace, DiscreteAction, Observation, ObservationSpace, RLError, Result,
};

/// Number of discrete fan-speed levels
pub const FAN_SPEED_LEVELS: usize = 4;

/// Lowest reportable CO2 level (outdoor air), ppm
pub const CO2_MIN_PPM: f64 = 400.0;

/// Highest reportable CO2 level, ppm
pub const CO2_MAX_PPM: f64 = 3000.0;

/// Bound on the per-step CO2 change reported in observations, ppm
pub const CO2_DIFF_LIMIT: f64 = 100.0;

/// Clamp a CO2 level into `[CO2_MIN_PPM, CO2_MAX_PPM]`
#[must_use]
pub fn clamp_co2(level: f64) -> f64 {
    level.clamp(CO2_MIN_PPM, CO2_MAX_PPM)
}

/// Clamp a CO2 change into `[-CO2_DIFF_LIMIT, CO2_DIFF_LIMIT]`
#[must_use]
pub fn clamp_co2_diff(diff: f64) -> f64 {
    diff.clamp(-CO2_DIFF_LIMIT, CO2_DIFF_LIMIT)
}

/// Fan speed index in `0..FAN_SPEED_LEVELS`
///
/// Index 0 is the slowest setting. Displayed as the 1-based level printed on
/// the ventilation unit (`FanSpeed1` .. `FanSpeed4`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "usize", into = "usize")]
pub struct FanSpeed(usize);

impl FanSpeed {
    /// Every fan speed, slowest first
    pub const ALL: [FanSpeed; FAN_SPEED_LEVELS] =
        [FanSpeed(0), FanSpeed(1), FanSpeed(2), FanSpeed(3)];

    /// Slowest setting
    pub const MIN: FanSpeed = FanSpeed(0);

    /// Fastest setting
    pub const MAX: FanSpeed = FanSpeed(FAN_SPEED_LEVELS - 1);

    /// Fan speed for a raw index
    pub fn new(index: usize) -> Result<Self> {
        if index < FAN_SPEED_LEVELS {
            Ok(Self(index))
        } else {
            Err(RLError::OutOfRange { index, len: FAN_SPEED_LEVELS })
        }
    }

    /// Zero-based index
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    /// One-based level as shown on the unit
    #[must_use]
    pub fn level(self) -> usize {
        self.0 + 1
    }
}

impl TryFrom<usize> for FanSpeed {
    type Error = RLError;

    fn try_from(index: usize) -> Result<Self> {
        Self::new(index)
    }
}

impl TryFrom<DiscreteAction> for FanSpeed {
    type Error = RLError;

    fn try_from(action: DiscreteAction) -> Result<Self> {
        Self::new(action.0).map_err(|_| {
            RLError::InvalidAction(format!(
                "{} is not a fan speed (expected 0..{FAN_SPEED_LEVELS})",
                action.0
            ))
        })
    }
}

impl From<FanSpeed> for usize {
    fn from(speed: FanSpeed) -> Self {
        speed.0
    }
}

impl From<FanSpeed> for DiscreteAction {
    fn from(speed: FanSpeed) -> Self {
        DiscreteAction(speed.0)
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// Observable state of the ventilated room
///
/// This is also the observation handed to agents: `[speed, co2_level, co2_diff]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VentilationState {
    /// Commanded fan speed
    pub ventilation_speed: FanSpeed,
    /// Indoor CO2 level, ppm
    pub co2_level: f64,
    /// Change in CO2 level since the previous step, ppm
    pub co2_diff: f64,
}

/// Observation type of the ventilation environments
pub type VentilationObservation = VentilationState;

impl VentilationState {
    /// Create a state from its parts
    #[must_use]
    pub fn new(ventilation_speed: FanSpeed, co2_level: f64, co2_diff: f64) -> Self {
        Self { ventilation_speed, co2_level, co2_diff }
    }

    /// Same state with CO2 fields clamped into their observation bounds
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            ventilation_speed: self.ventilation_speed,
            co2_level: clamp_co2(self.co2_level),
            co2_diff: clamp_co2_diff(self.co2_diff),
        }
    }
}

impl Default for VentilationState {
    fn default() -> Self {
        Self::new(FanSpeed::MIN, CO2_MIN_PPM, 0.0)
    }
}

impl Observation for VentilationState {
    #[allow(clippy::cast_precision_loss)]
    fn to_vec(&self) -> Vec<f64> {
        vec![self.ventilation_speed.index() as f64, self.co2_level, self.co2_diff]
    }

    fn shape(&self) -> Vec<usize> {
        vec![3]
    }
}

impl fmt::Display for VentilationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fan speed={}, CO2={}, CO2Diff={}",
            self.ventilation_speed, self.co2_level, self.co2_diff
        )
    }
}

/// Box space `[speed, co2_level, co2_diff]` with a typed observation
#[derive(Debug, Clone, PartialEq)]
pub struct VentilationObservationSpace {
    bounds: BoxObservationSpace,
}

impl VentilationObservationSpace {
    /// Space whose CO2 change is bounded by `diff_limit` in either direction
    pub fn new(diff_limit: f64) -> Result<Self> {
        #[allow(clippy::cast_precision_loss)]
        let top_speed = FanSpeed::MAX.index() as f64;
        let bounds = BoxObservationSpace::new(
            vec![0.0, CO2_MIN_PPM, -diff_limit],
            vec![top_speed, CO2_MAX_PPM, diff_limit],
            vec![3],
        )?;
        Ok(Self { bounds })
    }

    /// Lower and upper bounds
    #[must_use]
    pub fn bounds(&self) -> &BoxObservationSpace {
        &self.bounds
    }
}

impl ObservationSpace for VentilationObservationSpace {
    type Observation = VentilationState;

    fn sample(&self, rng: &mut dyn RngCore) -> Self::Observation {
        let speed = FanSpeed(rng.gen_range(0..FAN_SPEED_LEVELS));
        let co2_level = rng.gen_range(self.bounds.low[1]..=self.bounds.high[1]);
        let co2_diff = rng.gen_range(self.bounds.low[2]..=self.bounds.high[2]);
        VentilationState::new(speed, co2_level, co2_diff)
    }

    fn contains(&self, obs: &Self::Observation) -> bool {
        self.bounds.contains_values(&obs.to_vec())
    }

    fn shape(&self) -> Vec<usize> {
        self.bounds.shape.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fan_speed_bounds() {
        assert!(FanSpeed::ALL.iter().enumerate().all(|(i, s)| s.index() == i));
        assert!(matches!(FanSpeed::new(4), Err(RLError::OutOfRange { index: 4, len: 4 })));
        assert!(matches!(
            FanSpeed::try_from(DiscreteAction(7)),
            Err(RLError::InvalidAction(_))
        ));
        assert_eq!(FanSpeed::MAX.to_string(), "4");
    }

    #[test]
    fn test_fan_speed_serde_checks_range() {
        let speed: FanSpeed = serde_json::from_str("2").unwrap();
        assert_eq!(speed.index(), 2);
        assert!(serde_json::from_str::<FanSpeed>("9").is_err());
        assert_eq!(serde_json::to_string(&FanSpeed::MAX).unwrap(), "3");
    }

    #[test]
    fn test_state_observation_vector() {
        let state = VentilationState::new(FanSpeed::MAX, 812.5, -30.0);
        assert_eq!(state.to_vec(), vec![3.0, 812.5, -30.0]);
        assert_eq!(state.to_string(), "Fan speed=4, CO2=812.5, CO2Diff=-30");
        assert_eq!(VentilationState::default().to_vec(), vec![0.0, 400.0, 0.0]);
    }

    #[test]
    fn test_clamped_state() {
        let state = VentilationState::new(FanSpeed::MIN, 4200.0, 350.0).clamped();
        assert_eq!(state.co2_level, CO2_MAX_PPM);
        assert_eq!(state.co2_diff, CO2_DIFF_LIMIT);
    }

    #[test]
    fn test_observation_space() {
        let space = VentilationObservationSpace::new(CO2_DIFF_LIMIT).unwrap();
        assert!(space.contains(&VentilationState::default()));
        assert!(!space.contains(&VentilationState::new(FanSpeed::MIN, 399.0, 0.0)));

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..64 {
            assert!(space.contains(&space.sample(&mut rng)));
        }

        let flat = VentilationObservationSpace::new(0.0).unwrap();
        assert!(!flat.contains(&VentilationState::new(FanSpeed::MIN, 400.0, 1.0)));
    }
}
