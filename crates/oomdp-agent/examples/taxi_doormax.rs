//! Example: DOORmax learning the standard Taxi domain
//!
//! Run with `RUST_LOG=info` to follow episodes, `RUST_LOG=debug` to watch
//! effect records change status.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use oomdp_agent::{DoorMaxAgent, DoorMaxConfig, Probe, RandomAgent, RewardModelKind, Status};
use oomdp_core::{Agent, Environment, JsonConfig};
use oomdp_env::{make_env, TaxiAction, TaxiConfig, TaxiEnv, TaxiStart, TimeLimit};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Optional agent configuration as JSON
    let config = match std::env::args().nth(1) {
        Some(path) => DoorMaxConfig::from_path(&path).with_context(|| format!("reading {path}"))?,
        None => DoorMaxConfig {
            reward_model: RewardModelKind::Condition,
            max_episode_steps: 200,
            ..DoorMaxConfig::default()
        },
    };

    let taxi_config = TaxiConfig {
        seed: 7,
        ..TaxiConfig::default()
    };
    let mut env = TimeLimit::new(TaxiEnv::new(&taxi_config)?, config.max_episode_steps);
    let mut agent = DoorMaxAgent::<TaxiAction>::new(env.schema(), config)?;

    let summary = agent.train(&mut env, 5000)?;
    println!(
        "Trained for {} steps over {} episodes ({} deliveries), total reward {:.0}",
        summary.steps, summary.episodes, summary.completed, summary.total_reward
    );

    let counts = agent.learner().effect_model().status_counts();
    for status in [Status::Candidate, Status::Confirmed, Status::Overloaded, Status::Refuted] {
        let count = counts.get(&status).copied().unwrap_or_default();
        println!("  {:>10}: {count}", status.to_string());
    }

    // Greedy run from a fixed start
    let start = env.env.start_state(&TaxiStart::new((2, 2), 'Y', 'B'))?;
    let attempt = agent.attempt(&mut env, &Probe::new(start, 50))?;
    let actions: Vec<String> = attempt.actions.iter().map(ToString::to_string).collect();
    println!(
        "\nFrom (2,2), Y -> B: {} (return {:.0}, {})",
        actions.join(" "),
        attempt.total_reward,
        if attempt.success { "delivered" } else { "not delivered" }
    );

    // Baseline
    let mut env = TimeLimit::new(make_env("taxi", taxi_config)?, 200);
    let mut random = RandomAgent::<TaxiAction>::new(7);
    for _ in 0..10 {
        oomdp_agent::run_episode(&mut random, &mut env, None, 200)?;
    }
    println!(
        "Random agent: average reward {:.2} over {} episodes",
        random.metrics().avg_episode_reward,
        random.metrics().total_episodes
    );
    println!("DOORmax metrics: {}", serde_json::to_string_pretty(&agent.metrics())?);

    Ok(())
}
