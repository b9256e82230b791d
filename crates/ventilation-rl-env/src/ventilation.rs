//! CO2 ventilation environment
//!
//! One environment type covers every variant; the variant picks the
//! transition and reward strategies and the reset policy at construction.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::actuator::{Actuator, HttpActuator};
use crate::config::{ProductionConfig, VentilationConfig};
use crate::reward::{AirQualityReward, CostOnlyReward, RewardModel};
use crate::sensor::SensorFeed;
use crate::state::{
    clamp_co2, clamp_co2_diff, FanSpeed, VentilationObservationSpace, VentilationState,
    CO2_DIFF_LIMIT, FAN_SPEED_LEVELS,
};
use crate::telemetry::{EpisodeSummary, StepRecord, Telemetry, TracingTelemetry};
use crate::transition::{
    FixedBaselineTransition, SensorDrivenTransition, SimulatedTransition, TransitionModel,
};
use ventilation_rl_core::{
    ActionSpace, DiscreteAction, DiscreteSpace, Environment, EnvironmentConfig, ObservationSpace,
    RLError, RenderMode, Result, Reward, Step, StepInfo,
};

/// Which ventilation model the environment runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvVariant {
    /// Simulated CO2 generation and removal
    Simulated,
    /// Real fan commanded over REST, CO2 read from a sensor feed
    ProductionSensorDriven,
    /// No CO2 dynamics; rewards only reflect cost and churn
    Simplified,
}

impl EnvVariant {
    /// Human-readable name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Simulated => "CO2VentilationSimulator",
            Self::ProductionSensorDriven => "CO2VentilationProduction",
            Self::Simplified => "CO2VentilationSimple",
        }
    }

    fn diff_limit(self) -> f64 {
        match self {
            Self::Simplified => 0.0,
            Self::Simulated | Self::ProductionSensorDriven => CO2_DIFF_LIMIT,
        }
    }
}

impl fmt::Display for EnvVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenEpisode {
    id: Uuid,
    started_at: DateTime<Utc>,
}

/// Fan-speed control environment over indoor CO2
///
/// Observations are `(speed, co2_level, co2_diff)` and actions are fan speeds
/// `0..4`. `done` is always false; callers bound episodes themselves, for
/// example with [`crate::TimeLimit`].
pub struct VentilationEnv {
    variant: EnvVariant,
    transition: Box<dyn TransitionModel>,
    reward: Box<dyn RewardModel>,
    telemetry: Arc<dyn Telemetry>,
    observation_space: VentilationObservationSpace,
    rng: StdRng,
    state: VentilationState,
    previous_co2_level: f64,
    step_count: usize,
    iteration_count: usize,
    total_reward: Reward,
    episode: Option<OpenEpisode>,
}

impl VentilationEnv {
    /// Start building an environment of the given variant
    #[must_use]
    pub fn builder(variant: EnvVariant) -> VentilationEnvBuilder {
        VentilationEnvBuilder::new(variant)
    }

    /// Simulated environment with default configuration
    pub fn simulated() -> Result<Self> {
        Self::builder(EnvVariant::Simulated).build()
    }

    /// Simplified environment with default configuration
    pub fn simplified() -> Result<Self> {
        Self::builder(EnvVariant::Simplified).build()
    }

    /// Build a self-contained variant from an [`EnvironmentConfig`]
    ///
    /// The production variant needs an injected sensor feed and must be
    /// built through [`VentilationEnv::builder`].
    pub fn from_config(variant: EnvVariant, config: &EnvironmentConfig) -> Result<Self> {
        let mut builder =
            Self::builder(variant).config(VentilationConfig::from_environment_config(config)?);
        if let Some(seed) = config.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }

    /// Variant this environment runs
    #[must_use]
    pub fn variant(&self) -> EnvVariant {
        self.variant
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> VentilationState {
        self.state
    }

    /// Steps taken in the current episode
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Number of `reset` calls so far
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    /// Sum of rewards since the last `reset`
    #[must_use]
    pub fn total_reward(&self) -> f64 {
        self.total_reward.value()
    }

    /// Write the rendered state to `out`
    pub fn render_to<W: Write>(&self, mode: RenderMode, out: &mut W) -> Result<()> {
        match mode {
            RenderMode::Human => writeln!(out, "Environment state: {}", self.state)?,
        }
        Ok(())
    }

    fn finish_episode(&mut self) {
        if let Some(episode) = self.episode.take() {
            let summary = EpisodeSummary {
                episode_id: episode.id,
                iteration: self.iteration_count,
                steps: self.step_count,
                total_reward: self.total_reward.value(),
                started_at: episode.started_at,
                finished_at: Utc::now(),
            };
            info!(
                iteration = summary.iteration,
                steps = summary.steps,
                total_reward = summary.total_reward,
                "Episode finished"
            );
            self.telemetry.record_episode(&summary);
        }
    }

    fn reset_speed(&mut self) -> FanSpeed {
        match self.variant {
            EnvVariant::Simplified => FanSpeed::ALL[self.rng.gen_range(0..FAN_SPEED_LEVELS)],
            EnvVariant::Simulated | EnvVariant::ProductionSensorDriven => FanSpeed::MIN,
        }
    }
}

impl Environment for VentilationEnv {
    type Observation = VentilationState;
    type Action = DiscreteAction;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(self.observation_space.clone())
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(DiscreteSpace::new(FAN_SPEED_LEVELS))
    }

    fn reset(&mut self) -> Result<Self::Observation> {
        self.finish_episode();

        self.iteration_count += 1;
        self.step_count = 0;
        self.total_reward = Reward::default();

        let speed = self.reset_speed();
        let co2_level = self.state.co2_level;
        let co2_diff = clamp_co2_diff(co2_level - self.previous_co2_level);
        self.state = VentilationState::new(speed, co2_level, co2_diff);
        self.episode = Some(OpenEpisode { id: Uuid::new_v4(), started_at: Utc::now() });

        info!(
            variant = %self.variant,
            iteration = self.iteration_count,
            state = %self.state,
            "Episode started"
        );
        Ok(self.state)
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>> {
        if !DiscreteSpace::new(FAN_SPEED_LEVELS).contains(&action) {
            return Err(RLError::InvalidAction(format!(
                "{} is outside the action space 0..{FAN_SPEED_LEVELS}",
                action.0
            )));
        }
        if self.episode.is_none() {
            return Err(RLError::ResetRequired);
        }
        let speed = FanSpeed::try_from(action)?;
        let step_index = self.step_count + 1;
        debug!(iteration = self.iteration_count, step = step_index, "Step started");

        let previous = self.state;
        let next = self.transition.transition(&previous, speed)?;
        let next = VentilationState { ventilation_speed: speed, ..next }.clamped();

        let reward = self.reward.reward(
            next.co2_level,
            next.ventilation_speed,
            previous.ventilation_speed,
            step_index,
        );

        self.step_count = step_index;
        self.previous_co2_level = previous.co2_level;
        self.state = next;
        self.total_reward += reward;

        debug!(
            reward = reward.value(),
            total_reward = self.total_reward.value(),
            state = %self.state,
            "Step finished"
        );
        self.telemetry.record_step(&StepRecord {
            timestamp: Utc::now(),
            iteration: self.iteration_count,
            step: self.step_count,
            fan_speed: speed,
            reward: reward.value(),
            co2_level: self.state.co2_level,
            co2_diff: self.state.co2_diff,
        });

        Ok(Step {
            observation: self.state,
            reward,
            done: false,
            truncated: false,
            info: StepInfo::default(),
        })
    }

    fn render(&self, mode: RenderMode) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.render_to(mode, &mut out)
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        let seed = seed.unwrap_or_else(rand::random);
        self.rng = StdRng::seed_from_u64(seed);
        vec![seed]
    }

    fn close(&mut self) -> Result<()> {
        self.finish_episode();
        Ok(())
    }
}

/// Builder for [`VentilationEnv`]
pub struct VentilationEnvBuilder {
    variant: EnvVariant,
    config: VentilationConfig,
    telemetry: Option<Arc<dyn Telemetry>>,
    seed: Option<u64>,
    production: Option<ProductionConfig>,
    actuator: Option<Box<dyn Actuator>>,
    sensor_feed: Option<Box<dyn SensorFeed>>,
}

impl VentilationEnvBuilder {
    /// Builder with default configuration
    #[must_use]
    pub fn new(variant: EnvVariant) -> Self {
        Self {
            variant,
            config: VentilationConfig::default(),
            telemetry: None,
            seed: None,
            production: None,
            actuator: None,
            sensor_feed: None,
        }
    }

    /// Use these constants
    #[must_use]
    pub fn config(mut self, config: VentilationConfig) -> Self {
        self.config = config;
        self
    }

    /// Send step and episode records here instead of `tracing`
    #[must_use]
    pub fn telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Seed the random source
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Production endpoints; read from the process environment when not set
    #[must_use]
    pub fn production_config(mut self, production: ProductionConfig) -> Self {
        self.production = Some(production);
        self
    }

    /// Fan actuator; an [`HttpActuator`] for the configured endpoint when not set
    #[must_use]
    pub fn actuator(mut self, actuator: Box<dyn Actuator>) -> Self {
        self.actuator = Some(actuator);
        self
    }

    /// Sensor subscription, required by the production variant
    #[must_use]
    pub fn sensor_feed(mut self, feed: Box<dyn SensorFeed>) -> Self {
        self.sensor_feed = Some(feed);
        self
    }

    /// Build the environment
    ///
    /// The production variant installs its sensor filter and drains stale
    /// readings here; the last drained reading becomes the starting CO2 level.
    pub fn build(self) -> Result<VentilationEnv> {
        self.config.validate()?;

        let (mut transition, reward): (Box<dyn TransitionModel>, Box<dyn RewardModel>) =
            match self.variant {
                EnvVariant::Simulated => (
                    Box::new(SimulatedTransition::from_config(&self.config)),
                    Box::new(AirQualityReward::from_config(&self.config)),
                ),
                EnvVariant::Simplified => (
                    Box::new(FixedBaselineTransition::default()),
                    Box::new(CostOnlyReward::from_config(&self.config)),
                ),
                EnvVariant::ProductionSensorDriven => {
                    let production = match self.production {
                        Some(production) => production,
                        None => ProductionConfig::from_env()?,
                    };
                    let feed = self.sensor_feed.ok_or_else(|| {
                        RLError::Config("the production variant requires a sensor feed".to_string())
                    })?;
                    let actuator = match self.actuator {
                        Some(actuator) => actuator,
                        None => Box::new(HttpActuator::new(&production.actuator)?),
                    };
                    info!(
                        namespace = %production.service_bus.namespace,
                        topic = %production.service_bus.topic,
                        subscription = %production.service_bus.subscription,
                        sensor_id = %production.sensor_id,
                        "Subscribing to sensor events"
                    );
                    (
                        Box::new(SensorDrivenTransition::new(
                            actuator,
                            feed,
                            production.sensor_id,
                            self.config.sensor_wait()?,
                        )),
                        Box::new(AirQualityReward::from_config(&self.config)),
                    )
                }
            };

        let co2_level =
            clamp_co2(transition.initialize()?.unwrap_or(self.config.initial_co2_level));
        let rng = self.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        info!(
            variant = %self.variant,
            version = env!("CARGO_PKG_VERSION"),
            co2_level,
            "Ventilation environment created"
        );

        Ok(VentilationEnv {
            variant: self.variant,
            transition,
            reward,
            telemetry: self.telemetry.unwrap_or_else(|| Arc::new(TracingTelemetry)),
            observation_space: VentilationObservationSpace::new(self.variant.diff_limit())?,
            rng,
            state: VentilationState::new(FanSpeed::MIN, co2_level, 0.0),
            previous_co2_level: co2_level,
            step_count: 0,
            iteration_count: 0,
            total_reward: Reward::default(),
            episode: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{sensor_channel, SensorReading};
    use crate::telemetry::RecordingTelemetry;
    use approx::assert_abs_diff_eq;
    use ventilation_rl_core::Observation;

    fn recorded(variant: EnvVariant) -> (VentilationEnv, RecordingTelemetry) {
        let telemetry = RecordingTelemetry::new();
        let env = VentilationEnv::builder(variant)
            .telemetry(Arc::new(telemetry.clone()))
            .seed(123)
            .build()
            .unwrap();
        (env, telemetry)
    }

    #[test]
    fn test_simulated_first_step() {
        let mut env = VentilationEnv::simulated().unwrap();
        let obs = env.reset().unwrap();
        assert_eq!(obs.to_vec(), vec![0.0, 400.0, 0.0]);

        let step = env.step(DiscreteAction(3)).unwrap();
        assert_eq!(step.observation.ventilation_speed, FanSpeed::MAX);
        assert_eq!(step.observation.co2_level, 400.0);
        assert_abs_diff_eq!(step.reward.0, 0.2, epsilon = 1e-12);
        assert!(!step.done);
        assert!(!step.truncated);
        assert!(step.info.is_empty());
    }

    #[test]
    fn test_reset_counters() {
        let mut env = VentilationEnv::simulated().unwrap();
        assert_eq!(env.iteration_count(), 0);
        env.reset().unwrap();

        for action in [0, 1, 2, 3, 3] {
            env.step(DiscreteAction(action)).unwrap();
        }
        assert_eq!(env.step_count(), 5);
        assert!(env.total_reward() != 0.0);

        env.reset().unwrap();
        assert_eq!(env.step_count(), 0);
        assert_eq!(env.total_reward(), 0.0);
        assert_eq!(env.iteration_count(), 2);
    }

    #[test]
    fn test_total_reward_is_sum_of_step_rewards() {
        let mut env = VentilationEnv::simulated().unwrap();
        env.reset().unwrap();

        let mut sum = 0.0;
        for action in [0, 0, 3, 1, 2, 2, 0] {
            sum += env.step(DiscreteAction(action)).unwrap().reward.0;
        }
        assert_eq!(env.total_reward(), sum);
    }

    #[test]
    fn test_invalid_action_changes_nothing() {
        let mut env = VentilationEnv::simulated().unwrap();
        env.reset().unwrap();
        env.step(DiscreteAction(1)).unwrap();
        let before = env.state();

        let err = env.step(DiscreteAction(4)).unwrap_err();
        assert!(matches!(err, RLError::InvalidAction(_)));
        assert_eq!(env.step_count(), 1);
        assert_eq!(env.state(), before);
    }

    #[test]
    fn test_step_requires_reset() {
        let mut env = VentilationEnv::simulated().unwrap();
        assert!(matches!(env.step(DiscreteAction(0)), Err(RLError::ResetRequired)));

        env.reset().unwrap();
        env.close().unwrap();
        assert!(matches!(env.step(DiscreteAction(0)), Err(RLError::ResetRequired)));
    }

    #[test]
    fn test_reset_reports_carried_over_co2() {
        let mut env = VentilationEnv::builder(EnvVariant::Simulated)
            .config(VentilationConfig { initial_co2_level: 1000.0, ..VentilationConfig::default() })
            .build()
            .unwrap();
        env.reset().unwrap();
        env.step(DiscreteAction(0)).unwrap();
        env.step(DiscreteAction(0)).unwrap();

        let obs = env.reset().unwrap();
        assert_eq!(obs.ventilation_speed, FanSpeed::MIN);
        assert_abs_diff_eq!(obs.co2_level, 1030.0, epsilon = 1e-9);
        assert_abs_diff_eq!(obs.co2_diff, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_simplified_variant_keeps_baseline() {
        let (mut env, _) = recorded(EnvVariant::Simplified);
        let obs = env.reset().unwrap();
        assert_eq!(obs.co2_level, 400.0);
        assert_eq!(obs.co2_diff, 0.0);

        let step = env.step(DiscreteAction(2)).unwrap();
        assert_eq!(step.observation, VentilationState::new(FanSpeed::new(2).unwrap(), 400.0, 0.0));
        assert_abs_diff_eq!(step.reward.0, 0.6, epsilon = 1e-12);
        assert!(env.observation_space().contains(&step.observation));
    }

    #[test]
    fn test_seeded_simplified_resets_repeat() {
        let reset_speeds = |seed: u64| {
            let mut env = VentilationEnv::simplified().unwrap();
            assert_eq!(env.seed(Some(seed)), vec![seed]);
            (0..20).map(|_| env.reset().unwrap().ventilation_speed).collect::<Vec<_>>()
        };

        assert_eq!(reset_speeds(42), reset_speeds(42));
        assert!(reset_speeds(42).iter().all(|s| s.index() < FAN_SPEED_LEVELS));
    }

    #[test]
    fn test_seed_without_value_reports_effective_seed() {
        let mut env = VentilationEnv::simplified().unwrap();
        let seeds = env.seed(None);
        assert_eq!(seeds.len(), 1);
    }

    #[test]
    fn test_render_human() {
        let mut env = VentilationEnv::simulated().unwrap();
        env.reset().unwrap();
        env.step(DiscreteAction(3)).unwrap();
        let before = env.state();

        let mut out = Vec::new();
        env.render_to(RenderMode::Human, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Environment state: Fan speed=4, CO2=400, CO2Diff=0\n"
        );
        env.render(RenderMode::Human).unwrap();
        assert_eq!(env.state(), before);
    }

    #[test]
    fn test_telemetry_records() {
        let (mut env, telemetry) = recorded(EnvVariant::Simulated);
        env.reset().unwrap();
        env.step(DiscreteAction(3)).unwrap();
        env.step(DiscreteAction(1)).unwrap();
        env.reset().unwrap();
        env.step(DiscreteAction(0)).unwrap();
        env.close().unwrap();

        let steps = telemetry.steps();
        assert_eq!(steps.len(), 3);
        assert_eq!((steps[1].iteration, steps[1].step), (1, 2));
        assert_eq!(steps[2].fan_speed, FanSpeed::MIN);

        let episodes = telemetry.episodes();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].steps, 2);
        assert_abs_diff_eq!(
            episodes[0].total_reward,
            steps[0].reward + steps[1].reward,
            epsilon = 1e-12
        );
        assert_ne!(episodes[0].episode_id, episodes[1].episode_id);
    }

    #[test]
    fn test_production_requires_sensor_feed() {
        let production =
            ProductionConfig::from_lookup(|key| Some(format!("value-for-{key}"))).unwrap();
        let result = VentilationEnv::builder(EnvVariant::ProductionSensorDriven)
            .production_config(production)
            .build();
        assert!(matches!(result, Err(RLError::Config(_))));
    }

    #[test]
    fn test_from_config_applies_params_and_seed() {
        let config = EnvironmentConfig::default()
            .with_seed(5)
            .with_param("initial_co2_level", 900.0);
        let mut env = VentilationEnv::from_config(EnvVariant::Simulated, &config).unwrap();
        let obs = env.reset().unwrap();
        assert_eq!(obs.co2_level, 900.0);
    }

    #[test]
    fn test_large_sensor_jump_reports_clamped_diff() {
        let (publisher, feed) = sensor_channel();
        publisher.publish_reading(&SensorReading::new("1401011", 500.0)).unwrap();
        let production =
            ProductionConfig::from_lookup(|key| Some(format!("value-for-{key}"))).unwrap();
        let mut env = VentilationEnv::builder(EnvVariant::ProductionSensorDriven)
            .config(VentilationConfig { sensor_wait_secs: 0.05, ..VentilationConfig::default() })
            .production_config(ProductionConfig { sensor_id: "1401011".to_string(), ..production })
            .actuator(Box::new(|_: FanSpeed| -> Result<()> { Ok(()) }))
            .sensor_feed(Box::new(feed))
            .build()
            .unwrap();
        env.reset().unwrap();

        publisher.publish_reading(&SensorReading::new("1401011", 2000.0)).unwrap();
        let step = env.step(DiscreteAction(0)).unwrap();
        assert_eq!(step.observation.co2_level, 2000.0);
        assert_eq!(step.observation.co2_diff, CO2_DIFF_LIMIT);
        assert!(env.observation_space().contains(&step.observation));

        publisher.publish_reading(&SensorReading::new("1401011", 600.0)).unwrap();
        let step = env.step(DiscreteAction(0)).unwrap();
        assert_eq!(step.observation.co2_level, 600.0);
        assert_eq!(step.observation.co2_diff, -CO2_DIFF_LIMIT);

        // The next reset reports the clamped carry-over too.
        let obs = env.reset().unwrap();
        assert_eq!(obs.co2_diff, -CO2_DIFF_LIMIT);
    }
}
