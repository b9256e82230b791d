//! CO2 ventilation control environments
//!
//! This crate provides fan-speed control environments over indoor CO2:
//! - A simulator with fixed CO2 generation and speed-dependent removal
//! - A production variant that commands a real fan and reads a CO2 sensor
//! - A simplified variant where only operating cost shapes the reward
//!
//! Named environments come from the registry, already wrapped in a
//! [`TimeLimit`]:
//!
//! ```no_run
//! use ventilation_rl_env::prelude::*;
//!
//! let mut env = make_env(SIMULATOR_ID, &EnvironmentConfig::default().with_seed(7))?;
//! let obs = env.reset()?;
//! let step = env.step(DiscreteAction(3))?;
//! println!("{obs} -> {} (reward {})", step.observation, step.reward);
//! # Ok::<(), ventilation_rl_core::RLError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actuator;
pub mod config;
pub mod registry;
pub mod reward;
pub mod sensor;
pub mod state;
pub mod tables;
pub mod telemetry;
pub mod transition;
pub mod ventilation;
pub mod wrappers;

// Re-export environments
pub use ventilation::{EnvVariant, VentilationEnv, VentilationEnvBuilder};
pub use registry::{
    list_envs, make_env, register_env, BoxedEnv, EnvRegistry, DEFAULT_MAX_STEPS, SIMPLE_ID,
    SIMULATOR_ID,
};
pub use wrappers::TimeLimit;

// Re-export domain types
pub use actuator::{Actuator, DeviceTarget, FanSpeedCommand, HttpActuator};
pub use config::{ActuatorConfig, ProductionConfig, ServiceBusConfig, VentilationConfig};
pub use reward::{AirQualityReward, CostOnlyReward, OperatingCost, RewardModel, RewardTable};
pub use sensor::{sensor_channel, ChannelSensorFeed, SensorFeed, SensorPublisher, SensorReading};
pub use state::{FanSpeed, VentilationObservation, VentilationObservationSpace, VentilationState};
pub use tables::SpeedTable;
pub use telemetry::{EpisodeSummary, RecordingTelemetry, StepRecord, Telemetry, TracingTelemetry};
pub use transition::{
    FixedBaselineTransition, SensorDrivenTransition, SimulatedTransition, TransitionModel,
};

// Re-export core types
pub use ventilation_rl_core::{
    Action, ActionSpace, DiscreteAction, DiscreteSpace, Environment, EnvironmentConfig,
    Observation, ObservationSpace, RLError, RenderMode, Reward, Step, StepInfo,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        make_env, EnvVariant, EnvironmentConfig, FanSpeed, TimeLimit, VentilationEnv,
        VentilationState, SIMPLE_ID, SIMULATOR_ID,
    };
    pub use ventilation_rl_core::prelude::*;
}
