//! Transitions and episode trajectories

use serde::Serialize;

use crate::{Action, Reward, State};

/// Single transition `(s, a, r, s')`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition<A> {
    /// State the action was taken in
    pub state: State,
    /// Action taken
    pub action: A,
    /// Reward received
    pub reward: Reward,
    /// Resulting state
    pub next_state: State,
    /// Whether the environment terminated the episode
    pub done: bool,
    /// Whether a wrapper cut the episode short
    pub truncated: bool,
}

/// Complete trajectory of an episode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory<A> {
    /// Sequence of transitions
    pub transitions: Vec<Transition<A>>,
    /// Total undiscounted reward
    pub total_reward: f64,
    /// Sequential episode number
    pub episode_id: u64,
}

impl<A: Action> Trajectory<A> {
    /// Create a new empty trajectory
    #[must_use]
    pub fn new(episode_id: u64) -> Self {
        Self {
            transitions: Vec::new(),
            total_reward: 0.0,
            episode_id,
        }
    }

    /// Add a transition to the trajectory
    pub fn push(&mut self, transition: Transition<A>) {
        self.total_reward += transition.reward.0;
        self.transitions.push(transition);
    }

    /// Get the length of the trajectory
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if trajectory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Whether the last transition terminated the episode
    #[must_use]
    pub fn terminated(&self) -> bool {
        self.transitions.last().is_some_and(|t| t.done)
    }

    /// Actions in order
    #[must_use]
    pub fn actions(&self) -> Vec<A> {
        self.transitions.iter().map(|t| t.action).collect()
    }
}
