//! Fan speed actuators
//!
//! The production variant changes the real fan speed through an [`Actuator`].
//! [`HttpActuator`] posts a device command to the building's REST endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ActuatorConfig;
use crate::state::FanSpeed;
use ventilation_rl_core::{RLError, Result};

/// Sets the fan speed of a ventilation unit
pub trait Actuator: Send {
    /// Command the unit to run at `speed`
    fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<()>;
}

impl<F> Actuator for F
where
    F: FnMut(FanSpeed) -> Result<()> + Send,
{
    fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<()> {
        self(speed)
    }
}

/// Device addressed by fan speed commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTarget {
    /// Device group
    pub device_group_id: String,
    /// Device within the group
    pub device_id: String,
    /// Capability receiving the command
    pub capability_id: String,
}

impl Default for DeviceTarget {
    fn default() -> Self {
        Self {
            device_group_id: "Ventilation".to_string(),
            device_id: "302".to_string(),
            capability_id: "VentilationFan".to_string(),
        }
    }
}

/// Body of a fan speed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanSpeedCommand {
    /// Device group
    pub device_group_id: String,
    /// Device within the group
    pub device_id: String,
    /// Capability receiving the command
    pub capability_id: String,
    /// `FanSpeed1` .. `FanSpeed4`
    pub command_id: String,
    /// Command parameters, always empty for fan speeds
    pub parameters: String,
}

impl FanSpeedCommand {
    /// Command setting `target` to `speed`
    #[must_use]
    pub fn new(target: &DeviceTarget, speed: FanSpeed) -> Self {
        Self {
            device_group_id: target.device_group_id.clone(),
            device_id: target.device_id.clone(),
            capability_id: target.capability_id.clone(),
            command_id: format!("FanSpeed{}", speed.level()),
            parameters: String::new(),
        }
    }
}

/// Actuator backed by the building's REST command endpoint
pub struct HttpActuator {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    target: DeviceTarget,
}

impl HttpActuator {
    /// Create an actuator for the configured endpoint
    pub fn new(config: &ActuatorConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RLError::Actuator(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            target: config.target.clone(),
        })
    }
}

impl Actuator for HttpActuator {
    fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<()> {
        let command = FanSpeedCommand::new(&self.target, speed);
        info!(command_id = %command.command_id, "Sending fan speed command");

        let response = self
            .client
            .post(&self.url)
            .query(&[("code", self.api_key.as_str())])
            .json(&command)
            .send()
            .map_err(|e| RLError::Actuator(format!("REST call to change fan speed failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RLError::Actuator(format!(
                "REST call to change fan speed failed: {status}"
            )));
        }

        debug!(%status, "Fan speed command accepted");
        Ok(())
    }
}
