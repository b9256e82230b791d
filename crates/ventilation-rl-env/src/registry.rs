//! Environment registry for easy environment creation
//!
//! Built-in ids are registered on first use. Every environment made through
//! the registry is wrapped in a [`TimeLimit`] of
//! [`EnvironmentConfig::max_steps`] steps, [`DEFAULT_MAX_STEPS`] when unset.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::state::VentilationObservation;
use crate::ventilation::{EnvVariant, VentilationEnv};
use crate::wrappers::TimeLimit;
use ventilation_rl_core::{DiscreteAction, Environment, EnvironmentConfig, RLError, Result};

/// Registry id of the simulated environment
pub const SIMULATOR_ID: &str = "CO2VentilationSimulator-v0";

/// Registry id of the simplified environment
pub const SIMPLE_ID: &str = "CO2VentilationSimple-v0";

/// Step budget of registry environments
pub const DEFAULT_MAX_STEPS: usize = 60;

/// Environment handed out by the registry
pub type BoxedEnv =
    Box<dyn Environment<Observation = VentilationObservation, Action = DiscreteAction>>;

type EnvConstructor = Box<dyn Fn(&EnvironmentConfig) -> Result<BoxedEnv> + Send + Sync>;

lazy_static::lazy_static! {
    static ref REGISTRY: Mutex<EnvRegistry> = Mutex::new(EnvRegistry::with_builtins());
}

fn registry() -> MutexGuard<'static, EnvRegistry> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Named environment constructors
#[derive(Default)]
pub struct EnvRegistry {
    envs: HashMap<String, EnvConstructor>,
}

impl EnvRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in environments
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins = [
            (SIMULATOR_ID, EnvVariant::Simulated),
            (SIMPLE_ID, EnvVariant::Simplified),
        ];
        for (id, variant) in builtins {
            registry.register(id, move |config| {
                Ok(Box::new(VentilationEnv::from_config(variant, config)?) as BoxedEnv)
            });
        }
        registry
    }

    /// Register an environment, replacing any constructor with the same id
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&EnvironmentConfig) -> Result<BoxedEnv> + Send + Sync + 'static,
    {
        self.envs.insert(name.into(), Box::new(constructor));
    }

    /// Create an environment by name
    pub fn make(&self, name: &str, config: &EnvironmentConfig) -> Result<BoxedEnv> {
        let constructor = self
            .envs
            .get(name)
            .ok_or_else(|| RLError::Environment(format!("Unknown environment: {name}")))?;
        let env = constructor(config)?;
        let max_steps = config.max_steps.unwrap_or(DEFAULT_MAX_STEPS);
        Ok(Box::new(TimeLimit::new(env, max_steps)))
    }

    /// Registered ids, sorted
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.envs.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Register an environment globally
pub fn register_env<F>(name: impl Into<String>, constructor: F)
where
    F: Fn(&EnvironmentConfig) -> Result<BoxedEnv> + Send + Sync + 'static,
{
    registry().register(name, constructor);
}

/// Create an environment by name
pub fn make_env(name: &str, config: &EnvironmentConfig) -> Result<BoxedEnv> {
    registry().make(name, config)
}

/// List all registered environments
pub fn list_envs() -> Vec<String> {
    registry().list()
}
