//! Example: Production environment driven from async code
//!
//! A background thread stands in for the building: it watches the commanded
//! fan speed and publishes CO2 readings on the sensor feed. The environment
//! is wrapped in `Offloaded` so each blocking step runs on tokio's blocking
//! pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::info;
use ventilation_rl_core::{AsyncEnvironment, Offloaded};
use ventilation_rl_env::config::{ActuatorConfig, ServiceBusConfig, DEFAULT_CO2_SENSOR_ID};
use ventilation_rl_env::prelude::*;
use ventilation_rl_env::{sensor_channel, ProductionConfig, SensorReading, VentilationConfig};

fn local_production_config() -> ProductionConfig {
    ProductionConfig {
        service_bus: ServiceBusConfig {
            namespace: "local".to_string(),
            sas_key_name: "listen".to_string(),
            sas_key_value: "unused".to_string(),
            topic: "sensordata".to_string(),
            subscription: "test".to_string(),
        },
        actuator: ActuatorConfig {
            url: "http://localhost/unused".to_string(),
            api_key: "unused".to_string(),
            target: Default::default(),
            request_timeout_secs: 5,
        },
        sensor_id: DEFAULT_CO2_SENSOR_ID.to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let (publisher, feed) = sensor_channel();
    let fan = Arc::new(AtomicUsize::new(0));

    let building_fan = Arc::clone(&fan);
    thread::spawn(move || {
        let mut co2 = 1100.0_f64;
        loop {
            thread::sleep(Duration::from_millis(100));
            let removal = [0.1, 0.2, 0.5, 1.0][building_fan.load(Ordering::Relaxed)] * 50.0;
            co2 = (co2 + 20.0 - removal).clamp(400.0, 3000.0);
            let reading = SensorReading::new(DEFAULT_CO2_SENSOR_ID, co2);
            if publisher.publish_reading(&reading).is_err() {
                break;
            }
        }
    });

    let actuator_fan = Arc::clone(&fan);
    let actuator = move |speed: FanSpeed| -> Result<()> {
        actuator_fan.store(speed.index(), Ordering::Relaxed);
        Ok(())
    };

    let env = VentilationEnv::builder(EnvVariant::ProductionSensorDriven)
        .config(VentilationConfig { sensor_wait_secs: 0.5, ..VentilationConfig::default() })
        .production_config(local_production_config())
        .actuator(Box::new(actuator))
        .sensor_feed(Box::new(feed))
        .build()?;
    let mut env = Offloaded::new(TimeLimit::new(env, 20));

    let mut observation = env.reset().await?;
    loop {
        // Bang-bang controller: full speed above 1000 ppm, off below 800 ppm
        let action = if observation.co2_level > 1000.0 {
            3
        } else if observation.co2_level < 800.0 {
            0
        } else {
            observation.ventilation_speed.index()
        };
        let step = env.step(DiscreteAction(action)).await?;
        info!(state = %step.observation, reward = step.reward.value(), "Controller step");

        if step.done || step.truncated {
            break;
        }
        observation = step.observation;
    }

    let env = env.into_inner()?;
    println!("Total reward: {:.2}", env.env.total_reward());
    Ok(())
}
