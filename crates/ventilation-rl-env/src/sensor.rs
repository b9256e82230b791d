//! Sensor event subscription
//!
//! The production variant learns the CO2 level from sensor events published on
//! a message bus. [`SensorFeed`] is the subscription seen from the
//! environment; [`sensor_channel`] builds an in-process feed that a bus
//! listener (or a test) pushes raw message bodies into.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use ventilation_rl_core::{RLError, Result};

/// One sensor event, `{"Id": "...", "Value": ...}` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor identifier
    #[serde(rename = "Id")]
    pub id: String,
    /// Measured value
    #[serde(rename = "Value")]
    pub value: f64,
}

impl SensorReading {
    /// Create a reading
    pub fn new(id: impl Into<String>, value: f64) -> Self {
        Self { id: id.into(), value }
    }

    /// Parse a message body
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Subscription delivering sensor readings
pub trait SensorFeed: Send {
    /// Remove every filter rule from the subscription
    fn clear_filters(&mut self) -> Result<()>;

    /// Only deliver readings from `sensor_id`
    fn install_filter(&mut self, sensor_id: &str) -> Result<()>;

    /// Take every reading already pending, without waiting
    fn drain(&mut self) -> Result<Vec<SensorReading>>;

    /// Wait up to `timeout` for the next reading; `Ok(None)` when it elapses
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<SensorReading>>;
}

/// Create a connected publisher and feed
#[must_use]
pub fn sensor_channel() -> (SensorPublisher, ChannelSensorFeed) {
    let (tx, rx) = mpsc::channel();
    (SensorPublisher { tx }, ChannelSensorFeed { rx, filters: Vec::new() })
}

/// Sending half of an in-process sensor feed
#[derive(Debug, Clone)]
pub struct SensorPublisher {
    tx: Sender<String>,
}

impl SensorPublisher {
    /// Publish a raw message body
    pub fn publish(&self, body: impl Into<String>) -> Result<()> {
        self.tx
            .send(body.into())
            .map_err(|_| RLError::Sensor("sensor feed has been dropped".to_string()))
    }

    /// Publish a reading
    pub fn publish_reading(&self, reading: &SensorReading) -> Result<()> {
        self.publish(serde_json::to_string(reading)?)
    }
}

/// Receiving half of an in-process sensor feed
///
/// With no filter installed every well-formed reading is delivered.
#[derive(Debug)]
pub struct ChannelSensorFeed {
    rx: Receiver<String>,
    filters: Vec<String>,
}

impl ChannelSensorFeed {
    fn recv_forever(&mut self) -> Result<SensorReading> {
        loop {
            let body = self.rx.recv().map_err(|_| Self::disconnected())?;
            if let Some(reading) = self.accept(&body) {
                return Ok(reading);
            }
        }
    }

    fn disconnected() -> RLError {
        RLError::Sensor("all sensor publishers disconnected".to_string())
    }

    fn accept(&self, body: &str) -> Option<SensorReading> {
        let reading = match SensorReading::parse(body) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, body, "Discarding malformed sensor message");
                return None;
            }
        };
        if !self.filters.is_empty() && !self.filters.contains(&reading.id) {
            debug!(sensor_id = %reading.id, "Skipping reading from unsubscribed sensor");
            return None;
        }
        Some(reading)
    }
}

impl SensorFeed for ChannelSensorFeed {
    fn clear_filters(&mut self) -> Result<()> {
        self.filters.clear();
        Ok(())
    }

    fn install_filter(&mut self, sensor_id: &str) -> Result<()> {
        if !self.filters.iter().any(|f| f == sensor_id) {
            self.filters.push(sensor_id.to_string());
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<Vec<SensorReading>> {
        let mut readings = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(body) => readings.extend(self.accept(&body)),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        Ok(readings)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<SensorReading>> {
        // A wait too long to represent as an instant never times out.
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.recv_forever().map(Some);
        };
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(body) => {
                    if let Some(reading) = self.accept(&body) {
                        return Ok(Some(reading));
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(Self::disconnected()),
            }
        }
    }
}
