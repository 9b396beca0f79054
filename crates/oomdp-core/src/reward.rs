//! Reward signals

use serde::{Deserialize, Serialize};

/// Reward signal from the environment
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Reward(pub f64);

impl Reward {
    /// Create a new reward
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the reward value
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Reward {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Reward> for f64 {
    fn from(reward: Reward) -> Self {
        reward.0
    }
}

/// Reward and termination observed for one state–action pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardOutcome {
    /// Reward received
    pub reward: Reward,
    /// Whether the transition ended the episode
    pub terminal: bool,
}

impl RewardOutcome {
    /// Create an outcome
    #[must_use]
    pub fn new(reward: impl Into<Reward>, terminal: bool) -> Self {
        Self {
            reward: reward.into(),
            terminal,
        }
    }
}
