//! Tabular Q-learning baseline
//!
//! The model-free counterpart to DOORmax: one row of Q-values per visited
//! state, initialised to `r_max / (1 - γ)` and moved towards the one-step
//! target `r + γ·max Q(s')` after every transition. Exploration is
//! ε-greedy on top of the optimistic start.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use oomdp_core::{
    greedy_index, Action, ActionValueFunction, Agent, AgentMetrics, OomdpError, Result, State,
    Transition,
};

use crate::session::GreedyAgent;

/// Q-learning configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearnerConfig {
    /// Learning rate in `(0, 1]`
    pub alpha: f64,
    /// Discount factor in `[0, 1)`
    pub gamma: f64,
    /// Probability of a uniformly random action
    pub epsilon: f64,
    /// Largest reward the environment pays; sets the initial Q-value
    pub r_max: f64,
    /// Seed of the exploration RNG
    pub seed: u64,
}

impl Default for QLearnerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.95,
            epsilon: 0.1,
            r_max: 20.0,
            seed: 0,
        }
    }
}

impl QLearnerConfig {
    /// Reject out-of-range parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(OomdpError::Config(format!(
                "alpha must lie in (0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(OomdpError::Config(format!(
                "gamma must lie in [0, 1), got {}",
                self.gamma
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(OomdpError::Config(format!(
                "epsilon must lie in [0, 1], got {}",
                self.epsilon
            )));
        }
        if !self.r_max.is_finite() {
            return Err(OomdpError::Config("r_max must be finite".into()));
        }
        Ok(())
    }

    /// Q-value of a state–action pair that was never updated
    #[must_use]
    pub fn initial_value(&self) -> f64 {
        self.r_max / (1.0 - self.gamma)
    }
}

/// ε-greedy tabular Q-learning agent
#[derive(Debug, Clone)]
pub struct QLearnerAgent<A> {
    config: QLearnerConfig,
    table: IndexMap<State, Vec<f64>>,
    rng: StdRng,
    metrics: AgentMetrics,
    updates: usize,
    _action: PhantomData<A>,
}

impl<A: Action> QLearnerAgent<A> {
    /// Create an agent with an empty table
    pub fn new(config: QLearnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            table: IndexMap::new(),
            rng: StdRng::seed_from_u64(config.seed),
            metrics: AgentMetrics::default(),
            updates: 0,
            _action: PhantomData,
        })
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &QLearnerConfig {
        &self.config
    }

    /// Number of states with a row in the table
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.table.len()
    }

    /// Apply one temporal-difference update; returns the TD error
    pub fn update(&mut self, transition: &Transition<A>) -> Result<f64> {
        let terminal = transition.done && !transition.truncated;
        let target = if terminal {
            transition.reward.0
        } else {
            transition.reward.0 + self.config.gamma * self.best_value(&transition.next_state)
        };

        let initial = self.config.initial_value();
        let row = self
            .table
            .entry(transition.state.clone())
            .or_insert_with(|| vec![initial; A::count()]);
        let q = row.get_mut(transition.action.index()).ok_or_else(|| {
            OomdpError::IllegalAction(format!("action {} has no Q-value", transition.action.name()))
        })?;
        let error = target - *q;
        *q += self.config.alpha * error;
        self.updates += 1;
        Ok(error)
    }

    fn best_value(&self, state: &State) -> f64 {
        self.table.get(state).map_or(self.config.initial_value(), |row| {
            row.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        })
    }
}

impl<A: Action> GreedyAgent for QLearnerAgent<A> {
    fn greedy(&mut self, state: &State) -> Result<A> {
        // unseen states are all-optimistic, so the first action wins the tie
        let index = match self.table.get(state) {
            Some(row) => greedy_index(row)
                .ok_or_else(|| OomdpError::IllegalAction("empty action set".into()))?,
            None => 0,
        };
        A::from_index(index)
            .ok_or_else(|| OomdpError::IllegalAction(format!("action index {index} out of range")))
    }
}

impl<A: Action> Agent for QLearnerAgent<A> {
    type Action = A;

    fn act(&mut self, state: &State) -> Result<A> {
        if self.rng.gen::<f64>() < self.config.epsilon {
            return A::all()
                .choose(&mut self.rng)
                .copied()
                .ok_or_else(|| OomdpError::IllegalAction("empty action set".into()));
        }
        self.greedy(state)
    }

    fn observe(&mut self, transition: &Transition<A>) -> Result<()> {
        let error = self.update(transition)?;
        self.metrics.total_steps += 1;
        metrics::increment_counter!("oomdp_qlearner_updates_total");
        tracing::trace!(
            action = transition.action.name(),
            reward = transition.reward.0,
            td_error = error,
            "q update"
        );
        Ok(())
    }

    fn end_episode(&mut self, total_reward: f64) {
        self.metrics.record_episode(total_reward);
        metrics::increment_counter!("oomdp_agent_episodes_total");
    }

    fn metrics(&self) -> AgentMetrics {
        let mut metrics = self.metrics.clone();
        metrics.set("q_states", self.table.len());
        metrics.set("updates", self.updates);
        metrics
    }
}

impl<A: Action> ActionValueFunction for QLearnerAgent<A> {
    type Action = A;

    fn q_values(&self, state: &State) -> Option<Vec<f64>> {
        self.table.get(state).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{run_attempt, run_episode, Probe};
    use approx::assert_abs_diff_eq;
    use oomdp_core::{JsonConfig, Reward};
    use oomdp_env::{make_environment, TaxiAction, TaxiEnv, TaxiStart};

    fn start(env: &TaxiEnv, taxi: (i64, i64)) -> State {
        env.start_state(&TaxiStart::new(taxi, 'Y', 'B')).unwrap()
    }

    fn step(state: &State, action: TaxiAction, next: &State, reward: f64, done: bool) -> Transition<TaxiAction> {
        Transition {
            state: state.clone(),
            action,
            reward: Reward(reward),
            next_state: next.clone(),
            done,
            truncated: false,
        }
    }

    fn agent(alpha: f64, gamma: f64) -> QLearnerAgent<TaxiAction> {
        QLearnerAgent::new(QLearnerConfig {
            alpha,
            gamma,
            epsilon: 0.0,
            ..QLearnerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_td_update_towards_target() {
        let env = make_environment(0).unwrap();
        let (s, next) = (start(&env, (2, 2)), start(&env, (2, 1)));
        let mut agent = agent(0.5, 0.9);
        assert_abs_diff_eq!(agent.config().initial_value(), 200.0);

        // -1 + 0.9·200 = 179, halfway from 200
        let error = agent.update(&step(&s, TaxiAction::North, &next, -1.0, false)).unwrap();
        assert_abs_diff_eq!(error, -21.0);
        let q = agent.q_values(&s).unwrap();
        assert_abs_diff_eq!(q[0], 189.5);
        assert_abs_diff_eq!(q[1], 200.0);
        assert_eq!(agent.state_count(), 1);
    }

    #[test]
    fn test_terminal_target_ignores_next_state() {
        let env = make_environment(0).unwrap();
        let s = start(&env, (2, 2));
        let mut agent = agent(0.5, 0.9);
        agent.update(&step(&s, TaxiAction::Dropoff, &s, 20.0, true)).unwrap();
        assert_abs_diff_eq!(agent.q_values(&s).unwrap()[5], 110.0);

        // a cut-off episode still bootstraps
        let mut truncated = step(&s, TaxiAction::Pickup, &s, -10.0, true);
        truncated.truncated = true;
        agent.update(&truncated).unwrap();
        assert_abs_diff_eq!(agent.q_values(&s).unwrap()[4], 0.5 * 200.0 + 0.5 * (-10.0 + 0.9 * 200.0));
    }

    #[test]
    fn test_greedy_moves_past_penalised_action() {
        let env = make_environment(0).unwrap();
        let s = start(&env, (2, 2));
        let mut agent = agent(1.0, 0.9);
        assert_eq!(agent.greedy(&s).unwrap(), TaxiAction::North);
        agent.update(&step(&s, TaxiAction::North, &s, -10.0, false)).unwrap();
        assert_eq!(agent.greedy(&s).unwrap(), TaxiAction::South);
    }

    #[test]
    fn test_same_seed_same_episode() {
        let config = QLearnerConfig {
            epsilon: 0.3,
            seed: 4,
            ..QLearnerConfig::default()
        };
        let run = || {
            let mut env = make_environment(2).unwrap();
            let mut agent = QLearnerAgent::<TaxiAction>::new(config).unwrap();
            run_episode(&mut agent, &mut env, None, 60).unwrap().actions()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_attempt_does_not_learn() {
        let mut env = make_environment(1).unwrap();
        let mut agent = agent(0.1, 0.95);
        let probe = Probe::new(start(&env, (0, 0)), 10);
        let attempt = run_attempt(&mut agent, &mut env, &probe).unwrap();
        assert_eq!(attempt.actions.len(), 10);
        assert!(!attempt.success);
        assert_eq!(agent.state_count(), 0);
        assert_eq!(agent.metrics().total_steps, 0);
    }

    #[test]
    fn test_config_from_json_and_validation() {
        let config = QLearnerConfig::from_json_str(r#"{"alpha": 0.25}"#).unwrap();
        assert_abs_diff_eq!(config.alpha, 0.25);
        assert_abs_diff_eq!(config.gamma, 0.95);
        for bad in [
            QLearnerConfig { alpha: 0.0, ..QLearnerConfig::default() },
            QLearnerConfig { gamma: 1.0, ..QLearnerConfig::default() },
            QLearnerConfig { epsilon: 1.5, ..QLearnerConfig::default() },
        ] {
            assert!(matches!(
                QLearnerAgent::<TaxiAction>::new(bad),
                Err(OomdpError::Config(_))
            ));
        }
    }
}
