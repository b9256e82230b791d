//! Core reinforcement learning traits and types for the CO2 ventilation environments
//!
//! This crate provides the environment contract (`reset`/`step`/`render`/`seed`)
//! that learning agents drive, along with action and observation spaces,
//! the reward type and the shared error type.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod environment;
pub mod error;
pub mod observation;
pub mod offload;
pub mod reward;

// Re-export core traits and types
pub use action::{Action, ActionSpace, DiscreteAction, DiscreteSpace};
pub use environment::{Environment, EnvironmentConfig, RenderMode, Step, StepInfo};
pub use error::{RLError, Result};
pub use observation::{BoxObservationSpace, Observation, ObservationSpace, VectorObservation};
pub use offload::{AsyncEnvironment, Offloaded};
pub use reward::Reward;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSpace, AsyncEnvironment, DiscreteAction, Environment, Observation,
        ObservationSpace, RenderMode, Result, Reward, Step,
    };
}
