//! Agent traits and types

use serde::{Deserialize, Serialize};

use crate::{Action, Result, State, Transition};

/// Core agent trait
pub trait Agent {
    /// Action type
    type Action: Action;

    /// Select an action for the current state
    fn act(&mut self, state: &State) -> Result<Self::Action>;

    /// Process a transition from the environment (for learning)
    fn observe(&mut self, _transition: &Transition<Self::Action>) -> Result<()> {
        Ok(()) // Default: no learning
    }

    /// Note that an episode finished with the given total reward
    fn end_episode(&mut self, _total_reward: f64) {}

    /// Get agent metrics
    fn metrics(&self) -> AgentMetrics {
        AgentMetrics::default()
    }
}

/// Agent metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Total steps taken
    pub total_steps: usize,
    /// Total episodes
    pub total_episodes: usize,
    /// Average reward per episode
    pub avg_episode_reward: f64,
    /// Additional metrics
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl AgentMetrics {
    /// Fold a finished episode into the running mean
    pub fn record_episode(&mut self, total_reward: f64) {
        self.total_episodes += 1;
        #[allow(clippy::cast_precision_loss)]
        let n = self.total_episodes as f64;
        self.avg_episode_reward += (total_reward - self.avg_episode_reward) / n;
    }

    /// Set a custom metric
    pub fn set(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.custom.insert(key.to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut metrics = AgentMetrics::default();
        metrics.record_episode(10.0);
        metrics.record_episode(-2.0);
        metrics.record_episode(4.0);
        assert_eq!(metrics.total_episodes, 3);
        assert!((metrics.avg_episode_reward - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_fields_flatten() {
        let mut metrics = AgentMetrics::default();
        metrics.set("states", 12);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["states"], 12);
        assert_eq!(json["total_steps"], 0);
    }
}
