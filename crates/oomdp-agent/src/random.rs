//! Random agent for baseline comparisons

use oomdp_core::{Action, Agent, AgentMetrics, Policy, RandomPolicy, Result, State, Transition};

/// Agent that selects actions uniformly at random and never learns
#[derive(Debug, Clone)]
pub struct RandomAgent<A> {
    policy: RandomPolicy<A>,
    metrics: AgentMetrics,
}

impl<A: Action> RandomAgent<A> {
    /// Create a random agent from a seed
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            policy: RandomPolicy::new(seed),
            metrics: AgentMetrics::default(),
        }
    }
}

impl<A: Action> Agent for RandomAgent<A> {
    type Action = A;

    fn act(&mut self, state: &State) -> Result<A> {
        self.policy.select(state)
    }

    fn observe(&mut self, _transition: &Transition<A>) -> Result<()> {
        // Nothing to learn; only count the step
        self.metrics.total_steps += 1;
        Ok(())
    }

    fn end_episode(&mut self, total_reward: f64) {
        self.metrics.record_episode(total_reward);
    }

    fn metrics(&self) -> AgentMetrics {
        self.metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::run_episode;
    use oomdp_env::{make_environment, TaxiAction};

    #[test]
    fn test_random_agent_runs_episodes() {
        let mut env = make_environment(3).unwrap();
        let mut agent = RandomAgent::<TaxiAction>::new(3);
        let trajectory = run_episode(&mut agent, &mut env, None, 50).unwrap();
        assert!(!trajectory.is_empty());
        assert!(trajectory.len() <= 50);
        let metrics = agent.metrics();
        assert_eq!(metrics.total_steps, trajectory.len());
        assert_eq!(metrics.total_episodes, 1);
    }

    #[test]
    fn test_same_seed_same_actions() {
        let mut env = make_environment(1).unwrap();
        let mut a = RandomAgent::<TaxiAction>::new(9);
        let mut b = RandomAgent::<TaxiAction>::new(9);
        let first = run_episode(&mut a, &mut env, None, 30).unwrap();
        let mut env = make_environment(1).unwrap();
        let second = run_episode(&mut b, &mut env, None, 30).unwrap();
        assert_eq!(first.actions(), second.actions());
    }
}
