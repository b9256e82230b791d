//! Environment traits and types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Action, ActionSpace, Observation, ObservationSpace, RLError, Reward};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<O> {
    /// Observation from the environment
    pub observation: O,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Whether the episode was truncated (e.g., time limit)
    pub truncated: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

/// Additional information from a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// Whether no fields were reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Insert a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.fields.insert(key.into(), value.into());
    }
}

/// How an environment presents its state from `render`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// One human-readable line on the console
    #[default]
    Human,
}

impl FromStr for RenderMode {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            other => Err(RLError::UnsupportedRenderMode(other.to_string())),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => f.write_str("human"),
        }
    }
}

/// Configuration for environments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Random seed
    pub seed: Option<u64>,
    /// Maximum episode steps
    pub max_steps: Option<usize>,
    /// Render mode
    pub render_mode: Option<RenderMode>,
    /// Additional parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl EnvironmentConfig {
    /// Set the random seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the maximum episode length
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Add an environment-specific parameter
    #[must_use]
    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Core environment trait
///
/// Calls are synchronous: `step` may block the calling thread while the
/// environment waits on the outside world. One call may be in flight per
/// instance. Use [`crate::Offloaded`] to drive an environment from async code.
pub trait Environment: Send {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;

    /// Get the observation space
    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>>;

    /// Get the action space
    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>>;

    /// Start a new episode and return the initial observation
    fn reset(&mut self) -> crate::Result<Self::Observation>;

    /// Take a step in the environment
    fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation>>;

    /// Render the environment (optional)
    fn render(&self, mode: RenderMode) -> crate::Result<()> {
        let _ = mode;
        Ok(())
    }

    /// Seed the environment's random source, returning the seeds actually used
    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        let _ = seed;
        Vec::new()
    }

    /// Close the environment
    fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}

impl<E> Environment for Box<E>
where
    E: Environment + ?Sized,
{
    type Observation = E::Observation;
    type Action = E::Action;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        (**self).observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        (**self).action_space()
    }

    fn reset(&mut self) -> crate::Result<Self::Observation> {
        (**self).reset()
    }

    fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation>> {
        (**self).step(action)
    }

    fn render(&self, mode: RenderMode) -> crate::Result<()> {
        (**self).render(mode)
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        (**self).seed(seed)
    }

    fn close(&mut self) -> crate::Result<()> {
        (**self).close()
    }
}
