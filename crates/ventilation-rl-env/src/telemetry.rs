//! Step-trace and episode-summary records
//!
//! The environment reports every step and every finished episode to an
//! injected [`Telemetry`] sink as structured records. [`TracingTelemetry`]
//! turns them into `tracing` events; [`RecordingTelemetry`] keeps them in
//! memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use crate::state::FanSpeed;

/// Log target of step records
pub const STEP_TARGET: &str = "ventilation::step";

/// Log target of episode summaries
pub const EPISODE_TARGET: &str = "ventilation::episode";

/// One environment step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// When the step completed
    pub timestamp: DateTime<Utc>,
    /// Episode number, counted from 1
    pub iteration: usize,
    /// Step number within the episode, counted from 1
    pub step: usize,
    /// Fan speed after the step
    pub fan_speed: FanSpeed,
    /// Reward of the step
    pub reward: f64,
    /// CO2 level after the step, ppm
    pub co2_level: f64,
    /// CO2 change during the step, ppm
    pub co2_diff: f64,
}

/// One finished episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Unique episode id
    pub episode_id: Uuid,
    /// Episode number, counted from 1
    pub iteration: usize,
    /// Steps taken
    pub steps: usize,
    /// Sum of step rewards
    pub total_reward: f64,
    /// When `reset` started the episode
    pub started_at: DateTime<Utc>,
    /// When the next `reset` or `close` ended it
    pub finished_at: DateTime<Utc>,
}

/// Sink for environment records
pub trait Telemetry: Send + Sync {
    /// Record a completed step
    fn record_step(&self, record: &StepRecord);

    /// Record a finished episode
    fn record_episode(&self, summary: &EpisodeSummary);
}

/// Emits records as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record_step(&self, record: &StepRecord) {
        tracing::info!(
            target: STEP_TARGET,
            iteration = record.iteration,
            step = record.step,
            fan_speed = record.fan_speed.level(),
            reward = record.reward,
            co2_level = record.co2_level,
            co2_diff = record.co2_diff,
            "step"
        );
    }

    fn record_episode(&self, summary: &EpisodeSummary) {
        tracing::info!(
            target: EPISODE_TARGET,
            episode_id = %summary.episode_id,
            iteration = summary.iteration,
            steps = summary.steps,
            total_reward = summary.total_reward,
            duration_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
            "episode"
        );
    }
}

/// Keeps every record in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    steps: Arc<Mutex<Vec<StepRecord>>>,
    episodes: Arc<Mutex<Vec<EpisodeSummary>>>,
}

impl RecordingTelemetry {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Step records so far
    #[must_use]
    pub fn steps(&self) -> Vec<StepRecord> {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Episode summaries so far
    #[must_use]
    pub fn episodes(&self) -> Vec<EpisodeSummary> {
        self.episodes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record_step(&self, record: &StepRecord) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }

    fn record_episode(&self, summary: &EpisodeSummary) {
        self.episodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(summary.clone());
    }
}
