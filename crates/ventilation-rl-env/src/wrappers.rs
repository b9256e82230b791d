//! Environment wrappers

use ventilation_rl_core::{
    ActionSpace, Environment, ObservationSpace, RenderMode, Result, Step,
};

/// Info key set on the step that exhausts the budget
pub const TRUNCATED_INFO_KEY: &str = "TimeLimit.truncated";

/// Time limit wrapper
///
/// Marks `truncated` once `max_steps` steps have been taken since the last
/// `reset`. The inner environment's `done` flag is passed through unchanged.
pub struct TimeLimit<E> {
    /// Inner environment
    pub env: E,
    /// Maximum steps
    pub max_steps: usize,
    /// Current step count
    pub steps: usize,
}

impl<E> TimeLimit<E> {
    /// Create a new time limit wrapper
    pub fn new(env: E, max_steps: usize) -> Self {
        Self { env, max_steps, steps: 0 }
    }

    /// Unwrap the inner environment
    pub fn into_inner(self) -> E {
        self.env
    }
}

impl<E> Environment for TimeLimit<E>
where
    E: Environment,
{
    type Observation = E::Observation;
    type Action = E::Action;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    fn reset(&mut self) -> Result<Self::Observation> {
        self.steps = 0;
        self.env.reset()
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>> {
        let mut step = self.env.step(action)?;
        self.steps += 1;

        if self.steps >= self.max_steps {
            step.truncated = true;
            step.info.insert(TRUNCATED_INFO_KEY, !step.done);
        }

        Ok(step)
    }

    fn render(&self, mode: RenderMode) -> Result<()> {
        self.env.render(mode)
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        self.env.seed(seed)
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }
}
