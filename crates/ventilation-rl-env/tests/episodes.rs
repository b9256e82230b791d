//! Full-episode behaviour of the ventilation environments

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use ventilation_rl_core::{AsyncEnvironment, Offloaded, RLError};
use ventilation_rl_env::config::{ActuatorConfig, ServiceBusConfig};
use ventilation_rl_env::prelude::*;
use ventilation_rl_env::{
    sensor_channel, DeviceTarget, ProductionConfig, RecordingTelemetry, SensorPublisher,
    SensorReading, VentilationConfig,
};

const SENSOR: &str = "1401011";

fn production_config() -> ProductionConfig {
    ProductionConfig {
        service_bus: ServiceBusConfig {
            namespace: "test-namespace".to_string(),
            sas_key_name: "listen".to_string(),
            sas_key_value: "secret".to_string(),
            topic: "sensordata".to_string(),
            subscription: "test".to_string(),
        },
        actuator: ActuatorConfig {
            url: "http://127.0.0.1:9/unused".to_string(),
            api_key: "key".to_string(),
            target: DeviceTarget::default(),
            request_timeout_secs: 1,
        },
        sensor_id: SENSOR.to_string(),
    }
}

fn production_env(
    wait_secs: f64,
    actuator: impl FnMut(FanSpeed) -> Result<()> + Send + 'static,
) -> (VentilationEnv, SensorPublisher, RecordingTelemetry) {
    let (publisher, feed) = sensor_channel();
    publisher.publish_reading(&SensorReading::new(SENSOR, 850.0)).unwrap();
    publisher.publish_reading(&SensorReading::new(SENSOR, 880.0)).unwrap();

    let telemetry = RecordingTelemetry::new();
    let env = VentilationEnv::builder(EnvVariant::ProductionSensorDriven)
        .config(VentilationConfig { sensor_wait_secs: wait_secs, ..VentilationConfig::default() })
        .production_config(production_config())
        .actuator(Box::new(actuator))
        .sensor_feed(Box::new(feed))
        .telemetry(Arc::new(telemetry.clone()))
        .build()
        .unwrap();
    (env, publisher, telemetry)
}

#[test]
fn test_simulated_episode_through_registry() {
    let mut env = make_env(SIMULATOR_ID, &EnvironmentConfig::default()).unwrap();
    let space = env.observation_space();
    let obs = env.reset().unwrap();
    assert!(space.contains(&obs));

    let mut steps = 0;
    let mut total = 0.0;
    loop {
        let step = env.step(DiscreteAction(steps % 4)).unwrap();
        assert!(!step.done);
        assert!(space.contains(&step.observation));
        total += step.reward.0;
        steps += 1;
        if step.truncated {
            break;
        }
    }
    assert_eq!(steps, 60);
    assert!(total.is_finite());
}

#[test]
fn test_unventilated_room_fills_up() {
    let mut env = VentilationEnv::simulated().unwrap();
    env.reset().unwrap();

    let mut rewards = Vec::new();
    for _ in 0..200 {
        rewards.push(env.step(DiscreteAction(0)).unwrap().reward.0);
    }

    assert_eq!(env.state().co2_level, 3000.0);
    assert_eq!(env.state().co2_diff, 0.0);
    // Air quality drops through every band as CO2 rises.
    assert_abs_diff_eq!(rewards[0], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(*rewards.last().unwrap(), -0.6, epsilon = 1e-12);
    assert!(rewards.windows(2).all(|w| w[1] <= w[0] + 1e-12));
}

#[test]
fn test_full_ventilation_clears_room() {
    let config = VentilationConfig { initial_co2_level: 1500.0, ..VentilationConfig::default() };
    let mut env = VentilationEnv::builder(EnvVariant::Simulated).config(config).build().unwrap();
    env.reset().unwrap();

    let step = env.step(DiscreteAction(3)).unwrap();
    assert_abs_diff_eq!(step.observation.co2_diff, -30.0, epsilon = 1e-9);
    for _ in 0..100 {
        env.step(DiscreteAction(3)).unwrap();
    }
    assert_eq!(env.state().co2_level, 400.0);
}

#[test]
fn test_churn_penalised_after_first_step() {
    let mut env = VentilationEnv::simplified().unwrap();
    env.seed(Some(1));
    env.reset().unwrap();

    let first = env.step(DiscreteAction(1)).unwrap().reward.0;
    let hold = env.step(DiscreteAction(1)).unwrap().reward.0;
    let change = env.step(DiscreteAction(0)).unwrap().reward.0;

    assert_abs_diff_eq!(first, 0.8, epsilon = 1e-12);
    assert_abs_diff_eq!(hold, 0.8, epsilon = 1e-12);
    assert_abs_diff_eq!(change, 0.9, epsilon = 1e-12);
}

#[test]
fn test_production_episode_follows_sensor() {
    let commanded = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&commanded);
    let (mut env, publisher, telemetry) = production_env(1.0, move |speed| {
        log.lock().unwrap().push(speed.level());
        Ok(())
    });

    // Stale readings are drained at construction; the last one is the baseline.
    let obs = env.reset().unwrap();
    assert_eq!(obs, VentilationState::new(FanSpeed::MIN, 880.0, 0.0));

    publisher.publish(r#"{"Id": "other", "Value": 2500}"#).unwrap();
    publisher.publish_reading(&SensorReading::new(SENSOR, 1010.0)).unwrap();
    let step = env.step(DiscreteAction(3)).unwrap();
    assert_eq!(step.observation.co2_level, 1010.0);
    // A 130 ppm jump is reported at the edge of the observation range.
    assert_eq!(step.observation.co2_diff, 100.0);
    assert_abs_diff_eq!(step.reward.0, 0.4 - 0.8, epsilon = 1e-12);

    let delayed = publisher.clone();
    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        delayed.publish_reading(&SensorReading::new(SENSOR, 960.0)).unwrap();
    });
    let step = env.step(DiscreteAction(3)).unwrap();
    sender.join().unwrap();
    assert_eq!(step.observation.co2_level, 960.0);
    assert_eq!(step.observation.co2_diff, -50.0);

    assert_eq!(*commanded.lock().unwrap(), vec![4, 4]);
    assert_eq!(telemetry.steps().len(), 2);
}

#[test]
fn test_production_timeout_keeps_co2() {
    let (mut env, _publisher, _) = production_env(0.05, |_| Ok(()));
    env.reset().unwrap();

    let step = env.step(DiscreteAction(2)).unwrap();
    assert_eq!(step.observation.ventilation_speed, FanSpeed::new(2).unwrap());
    assert_eq!(step.observation.co2_level, 880.0);
    assert_eq!(step.observation.co2_diff, 0.0);
    assert!(!step.done);
}

#[test]
fn test_production_actuator_failure_is_not_fatal() {
    let (mut env, publisher, _) = production_env(1.0, |_| {
        Err(RLError::Actuator("ventilation endpoint returned 503".to_string()))
    });
    env.reset().unwrap();

    publisher.publish_reading(&SensorReading::new(SENSOR, 900.0)).unwrap();
    let step = env.step(DiscreteAction(1)).unwrap();
    assert_eq!(step.observation.ventilation_speed.index(), 1);
    assert_eq!(step.observation.co2_level, 900.0);
    assert_eq!(env.step_count(), 1);
}

#[test]
fn test_production_needs_configuration() {
    let (_publisher, feed) = sensor_channel();
    let result = VentilationEnv::builder(EnvVariant::ProductionSensorDriven)
        .production_config(production_config())
        .sensor_feed(Box::new(feed))
        .config(VentilationConfig { sensor_wait_secs: f64::NAN, ..VentilationConfig::default() })
        .build();
    assert!(matches!(result, Err(RLError::Config(_))));
}

#[tokio::test]
async fn test_offloaded_production_step() {
    let (env, publisher, _) = production_env(1.0, |_| Ok(()));
    let mut env = Offloaded::new(env);

    env.reset().await.unwrap();
    publisher.publish_reading(&SensorReading::new(SENSOR, 1205.0)).unwrap();
    let step = env.step(DiscreteAction(3)).await.unwrap();
    assert_eq!(step.observation.co2_level, 1205.0);

    env.close().await.unwrap();
    assert_eq!(env.into_inner().unwrap().iteration_count(), 1);
}
