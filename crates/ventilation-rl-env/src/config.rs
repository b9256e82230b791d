//! Environment configuration
//!
//! [`VentilationConfig`] holds the tunable constants of every variant and is
//! read from [`EnvironmentConfig::params`]. [`ProductionConfig`] holds the
//! endpoints and credentials of the production variant and is read from
//! environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::actuator::DeviceTarget;
use crate::reward::RewardTable;
use crate::state::{CO2_MAX_PPM, CO2_MIN_PPM};
use crate::tables::SpeedTable;
use ventilation_rl_core::{EnvironmentConfig, RLError, Result};

/// Sensor id of the CO2 sensor in the reference installation
pub const DEFAULT_CO2_SENSOR_ID: &str = "1401011";

/// Longest accepted production sensor wait
pub const MAX_SENSOR_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Tunable constants of the ventilation environments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VentilationConfig {
    /// Energy penalty per fan speed
    pub energy_cost: SpeedTable,
    /// Airflow effectiveness per fan speed (simulated variant)
    pub airflow_volume: SpeedTable,
    /// CO2 produced by occupants per step, ppm
    pub co2_generation: f64,
    /// CO2 removed per step at full airflow, ppm
    pub co2_removal_rate: f64,
    /// CO2 level before the first reading or transition, ppm
    pub initial_co2_level: f64,
    /// Air-quality reward bands (simulated and production variants)
    pub reward_table: RewardTable,
    /// Constant air-quality term of the simplified variant
    pub simplified_base_reward: f64,
    /// Deduction for changing fan speed between steps
    pub churn_penalty: f64,
    /// How long a production step waits for a sensor reading, seconds
    pub sensor_wait_secs: f64,
}

impl Default for VentilationConfig {
    fn default() -> Self {
        Self {
            energy_cost: SpeedTable::ENERGY_COST,
            airflow_volume: SpeedTable::AIRFLOW_VOLUME,
            co2_generation: 20.0,
            co2_removal_rate: 50.0,
            initial_co2_level: CO2_MIN_PPM,
            reward_table: RewardTable::default(),
            simplified_base_reward: 1.0,
            churn_penalty: 0.1,
            sensor_wait_secs: 60.0,
        }
    }
}

impl VentilationConfig {
    /// Read from the environment-specific parameters of an [`EnvironmentConfig`]
    ///
    /// Missing fields take their defaults; unknown fields are rejected.
    pub fn from_environment_config(config: &EnvironmentConfig) -> Result<Self> {
        let params = serde_json::Value::Object(config.params.clone());
        let parsed: Self = serde_json::from_value(params)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check the configuration is internally consistent
    pub fn validate(&self) -> Result<()> {
        if !self.energy_cost.is_finite() || !self.energy_cost.is_non_decreasing() {
            return Err(RLError::Config(
                "energy cost must be finite and non-decreasing in fan speed".to_string(),
            ));
        }
        if !self.airflow_volume.is_finite() {
            return Err(RLError::Config("airflow volume must be finite".to_string()));
        }
        let scalars = [
            ("co2_generation", self.co2_generation),
            ("co2_removal_rate", self.co2_removal_rate),
            ("simplified_base_reward", self.simplified_base_reward),
            ("churn_penalty", self.churn_penalty),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RLError::Config(format!("{name} must be finite")));
        }
        if !(CO2_MIN_PPM..=CO2_MAX_PPM).contains(&self.initial_co2_level) {
            return Err(RLError::Config(format!(
                "initial_co2_level must lie in [{CO2_MIN_PPM}, {CO2_MAX_PPM}], got {}",
                self.initial_co2_level
            )));
        }
        if self.sensor_wait()? > MAX_SENSOR_WAIT {
            return Err(RLError::Config(format!(
                "sensor_wait_secs must not exceed {} seconds",
                MAX_SENSOR_WAIT.as_secs()
            )));
        }
        self.reward_table.validate()
    }

    /// Bounded wait of a production step
    pub fn sensor_wait(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.sensor_wait_secs).map_err(|e| {
            RLError::Config(format!("invalid sensor_wait_secs {}: {e}", self.sensor_wait_secs))
        })
    }
}

/// Message bus holding the sensor event subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBusConfig {
    /// Bus namespace
    pub namespace: String,
    /// Shared access key name
    pub sas_key_name: String,
    /// Shared access key value
    pub sas_key_value: String,
    /// Topic carrying sensor data
    pub topic: String,
    /// Subscription on the topic
    pub subscription: String,
}

/// REST endpoint that changes the fan speed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Endpoint URL
    pub url: String,
    /// API key passed as the `code` query parameter
    pub api_key: String,
    /// Device addressed by each command
    #[serde(default)]
    pub target: DeviceTarget,
    /// Request timeout, seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Endpoints and credentials of the production variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionConfig {
    /// Sensor event bus
    pub service_bus: ServiceBusConfig,
    /// Fan speed actuator
    pub actuator: ActuatorConfig,
    /// Only readings from this sensor update the CO2 level
    pub sensor_id: String,
}

impl ProductionConfig {
    /// Read from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary variable lookup
    ///
    /// Required: `SERVICE_BUS_NAMESPACE`, `SERVICE_BUS_SAS_KEY_NAME`,
    /// `SERVICE_BUS_SAS_KEY_VALUE`, `VENTILATION_REST_URL`,
    /// `VENTILATION_REST_API_KEY`. Optional: `CO2_SENSOR_ID`,
    /// `SERVICE_BUS_TOPIC`, `SERVICE_BUS_SUBSCRIPTION`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            optional(key)
                .ok_or_else(|| RLError::Config(format!("missing environment variable {key}")))
        };

        Ok(Self {
            service_bus: ServiceBusConfig {
                namespace: required("SERVICE_BUS_NAMESPACE")?,
                sas_key_name: required("SERVICE_BUS_SAS_KEY_NAME")?,
                sas_key_value: required("SERVICE_BUS_SAS_KEY_VALUE")?,
                topic: optional("SERVICE_BUS_TOPIC").unwrap_or_else(|| "sensordata".to_string()),
                subscription: optional("SERVICE_BUS_SUBSCRIPTION")
                    .unwrap_or_else(|| "test".to_string()),
            },
            actuator: ActuatorConfig {
                url: required("VENTILATION_REST_URL")?,
                api_key: required("VENTILATION_REST_API_KEY")?,
                target: DeviceTarget::default(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            sensor_id: optional("CO2_SENSOR_ID")
                .unwrap_or_else(|| DEFAULT_CO2_SENSOR_ID.to_string()),
        })
    }
}
