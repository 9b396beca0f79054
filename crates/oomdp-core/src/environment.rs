//! Environment traits and types

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{Action, Budget, DiscreteAction, Result, Reward, Schema, State};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step {
    /// State after the step
    pub state: State,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Whether the episode was truncated (e.g., time limit)
    pub truncated: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

/// Additional information from a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// Info with a single `event` field
    #[must_use]
    pub fn event(name: &str) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("event".into(), serde_json::Value::from(name));
        Self { fields }
    }

    /// The `event` field, if present
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.fields.get("event").and_then(serde_json::Value::as_str)
    }
}

/// Episode information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Sequential episode number
    pub id: u64,
    /// Total reward
    pub total_reward: f64,
    /// Number of steps
    pub steps: usize,
    /// Whether the environment terminated the episode
    pub terminated: bool,
    /// Whether episode was truncated
    pub truncated: bool,
}

/// Core environment trait
///
/// Environments are synchronous and deterministic given their seed.
pub trait Environment {
    /// Action type
    type Action: Action;

    /// Schema every emitted state is typed against
    fn schema(&self) -> &Arc<Schema>;

    /// Start a new episode
    fn reset(&mut self) -> Result<State>;

    /// Start a new episode from a given state
    fn reset_to(&mut self, state: State) -> Result<State>;

    /// Take a step in the environment
    fn step(&mut self, action: Self::Action) -> Result<Step>;

    /// Take a step given a raw action symbol
    ///
    /// Fails with `IllegalAction` if the symbol is outside the action set.
    fn step_symbol(&mut self, symbol: DiscreteAction) -> Result<Step> {
        let action = symbol.resolve::<Self::Action>()?;
        self.step(action)
    }

    /// Current state, if an episode is running
    fn state(&self) -> Option<&State>;

    /// Attach a cancellation budget
    fn set_budget(&mut self, budget: Budget);

    /// Get current episode info
    fn episode_info(&self) -> Option<Episode> {
        None
    }
}

/// Wrapper for environments that tracks episodes
pub struct TrackedEnvironment<E> {
    /// Inner environment
    pub env: E,
    /// Current episode
    pub episode: Option<Episode>,
    /// Finished episodes
    pub history: Vec<Episode>,
    next_id: u64,
}

impl<E> TrackedEnvironment<E> {
    /// Create a new tracked environment
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode: None,
            history: Vec::new(),
            next_id: 0,
        }
    }

    fn begin(&mut self) {
        if let Some(episode) = self.episode.take() {
            self.history.push(episode);
        }
        self.episode = Some(Episode {
            id: self.next_id,
            ..Episode::default()
        });
        self.next_id += 1;
    }
}

impl<E: Environment> Environment for TrackedEnvironment<E> {
    type Action = E::Action;

    fn schema(&self) -> &Arc<Schema> {
        self.env.schema()
    }

    fn reset(&mut self) -> Result<State> {
        let state = self.env.reset()?;
        self.begin();
        Ok(state)
    }

    fn reset_to(&mut self, state: State) -> Result<State> {
        let state = self.env.reset_to(state)?;
        self.begin();
        Ok(state)
    }

    fn step(&mut self, action: Self::Action) -> Result<Step> {
        let step = self.env.step(action)?;
        if let Some(episode) = self.episode.as_mut() {
            episode.total_reward += step.reward.0;
            episode.steps += 1;
            episode.terminated = step.done && !step.truncated;
            episode.truncated = step.truncated;
        }
        Ok(step)
    }

    fn state(&self) -> Option<&State> {
        self.env.state()
    }

    fn set_budget(&mut self, budget: Budget) {
        self.env.set_budget(budget);
    }

    fn episode_info(&self) -> Option<Episode> {
        self.episode.clone()
    }
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    type Action = E::Action;

    fn schema(&self) -> &Arc<Schema> {
        (**self).schema()
    }

    fn reset(&mut self) -> Result<State> {
        (**self).reset()
    }

    fn reset_to(&mut self, state: State) -> Result<State> {
        (**self).reset_to(state)
    }

    fn step(&mut self, action: Self::Action) -> Result<Step> {
        (**self).step(action)
    }

    fn state(&self) -> Option<&State> {
        (**self).state()
    }

    fn set_budget(&mut self, budget: Budget) {
        (**self).set_budget(budget);
    }

    fn episode_info(&self) -> Option<Episode> {
        (**self).episode_info()
    }
}
