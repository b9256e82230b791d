//! Example: Random agent controlling the simulated ventilation

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;
use ventilation_rl_env::prelude::*;

fn main() -> anyhow::Result<()> {
    // Initialize logging; RUST_LOG=ventilation::step=info shows every step
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // Registry environments already carry a 60-step time limit
    let mut env = make_env(SIMULATOR_ID, &EnvironmentConfig::default().with_seed(7))?;
    let action_space = env.action_space();
    let mut rng = StdRng::seed_from_u64(7);

    let num_episodes = 10;
    let mut episode_rewards = Vec::new();

    for episode in 0..num_episodes {
        let mut observation = env.reset()?;
        let mut rewards = Vec::new();

        loop {
            let action = action_space.sample(&mut rng);
            let step = env.step(action)?;
            rewards.push(step.reward);

            if step.done || step.truncated {
                break;
            }
            observation = step.observation;
        }

        let steps = rewards.len();
        let total_reward: Reward = rewards.into_iter().sum();
        episode_rewards.push(total_reward.value());
        println!(
            "Episode {}: Total Reward = {:.2}, Steps = {}, Last state: {}",
            episode + 1,
            total_reward.value(),
            steps,
            observation
        );
    }

    #[allow(clippy::cast_precision_loss)]
    let avg_reward = episode_rewards.iter().sum::<f64>() / episode_rewards.len() as f64;
    println!("\nAverage Reward over {num_episodes} episodes: {avg_reward:.2}");

    env.close()?;
    Ok(())
}
