//! Async access to blocking environments
//!
//! [`Environment::step`] may block for a long time (a production environment
//! waits for a sensor reading). [`Offloaded`] moves each call onto tokio's
//! blocking pool so async drivers can await it without stalling the runtime.

use async_trait::async_trait;

use crate::{Environment, RLError, RenderMode, Step};

/// Async counterpart of [`Environment`]
#[async_trait]
pub trait AsyncEnvironment: Send {
    /// Observation type
    type Observation: Send;
    /// Action type
    type Action: Send;

    /// Start a new episode
    async fn reset(&mut self) -> crate::Result<Self::Observation>;

    /// Take a step in the environment
    async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation>>;

    /// Render the environment
    async fn render(&mut self, mode: RenderMode) -> crate::Result<()>;

    /// Close the environment
    async fn close(&mut self) -> crate::Result<()>;
}

/// Runs a blocking environment on tokio's blocking thread pool
pub struct Offloaded<E> {
    env: Option<E>,
}

impl<E> Offloaded<E>
where
    E: Environment + 'static,
{
    /// Wrap an environment
    pub fn new(env: E) -> Self {
        Self { env: Some(env) }
    }

    /// Get the wrapped environment back
    pub fn into_inner(self) -> crate::Result<E> {
        self.env.ok_or_else(Self::lost)
    }

    /// Borrow the wrapped environment between calls
    pub fn get_ref(&self) -> crate::Result<&E> {
        self.env.as_ref().ok_or_else(Self::lost)
    }

    fn lost() -> RLError {
        RLError::Environment("environment lost by a cancelled or panicked call".to_string())
    }

    async fn run<T, F>(&mut self, call: F) -> crate::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut E) -> crate::Result<T> + Send + 'static,
    {
        let mut env = self.env.take().ok_or_else(Self::lost)?;
        let (env, result) = tokio::task::spawn_blocking(move || {
            let result = call(&mut env);
            (env, result)
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Blocking environment task failed");
            RLError::Environment(format!("blocking environment task failed: {e}"))
        })?;
        self.env = Some(env);
        result
    }
}

#[async_trait]
impl<E> AsyncEnvironment for Offloaded<E>
where
    E: Environment + 'static,
    E::Observation: 'static,
    E::Action: 'static,
{
    type Observation = E::Observation;
    type Action = E::Action;

    async fn reset(&mut self) -> crate::Result<Self::Observation> {
        self.run(E::reset).await
    }

    async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation>> {
        self.run(move |env| env.step(action)).await
    }

    async fn render(&mut self, mode: RenderMode) -> crate::Result<()> {
        self.run(move |env| env.render(mode)).await
    }

    async fn close(&mut self) -> crate::Result<()> {
        self.run(E::close).await
    }
}
