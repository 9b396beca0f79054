//! Shared helpers for the Taxi integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use oomdp_agent::{DoorMaxAgent, DoorMaxConfig, RewardModelKind};
use oomdp_core::{Action, Environment, State};
use oomdp_env::{make_environment, TaxiAction, TaxiEnv, TaxiStart};

/// Route test logs through the capture-aware writer; repeated calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Standard Taxi with a fixed seed
pub fn taxi(seed: u64) -> TaxiEnv {
    make_environment(seed).unwrap()
}

/// State for an explicit start on `env`'s layout
pub fn start(env: &TaxiEnv, taxi: (i64, i64), passenger: char, destination: char) -> State {
    env.start_state(&TaxiStart::new(taxi, passenger, destination)).unwrap()
}

/// Fresh DOORmax agent for `env`, with the given reward model
pub fn agent(env: &TaxiEnv, reward_model: RewardModelKind) -> DoorMaxAgent<TaxiAction> {
    let config = DoorMaxConfig {
        reward_model,
        max_episode_steps: 200,
        ..DoorMaxConfig::default()
    };
    DoorMaxAgent::new(env.schema(), config).unwrap()
}

/// An optimal episode found by breadth-first search over the true dynamics
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Action sequence
    pub actions: Vec<TaxiAction>,
    /// Undiscounted return
    pub total_reward: f64,
}

/// Shortest action sequence from `from` to a terminating step
///
/// Every non-terminal step costs at least one unit, so the shortest
/// sequence also has the highest return.
pub fn solve(env: &mut TaxiEnv, from: &State) -> Option<Solution> {
    let mut parents: HashMap<State, Option<(State, TaxiAction, f64)>> = HashMap::new();
    let mut queue = VecDeque::new();
    parents.insert(from.clone(), None);
    queue.push_back(from.clone());

    while let Some(state) = queue.pop_front() {
        for &action in TaxiAction::all() {
            env.reset_to(state.clone()).unwrap();
            let step = env.step(action).unwrap();
            if step.done {
                let mut actions = vec![action];
                let mut total_reward = step.reward.0;
                let mut cursor = state.clone();
                while let Some(Some((parent, taken, reward))) = parents.get(&cursor) {
                    actions.push(*taken);
                    total_reward += reward;
                    cursor = parent.clone();
                }
                actions.reverse();
                return Some(Solution {
                    actions,
                    total_reward,
                });
            }
            if !parents.contains_key(&step.state) {
                parents.insert(step.state.clone(), Some((state.clone(), action, step.reward.0)));
                queue.push_back(step.state);
            }
        }
    }
    None
}
