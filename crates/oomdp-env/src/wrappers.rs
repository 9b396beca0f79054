//! Environment wrappers

use std::sync::Arc;

use oomdp_core::{Budget, Environment, Episode, OomdpError, Result, Schema, State, Step};

/// Time limit wrapper
///
/// Marks the step that reaches `max_steps` as done and truncated; stepping
/// again before a reset fails.
pub struct TimeLimit<E> {
    /// Inner environment
    pub env: E,
    /// Maximum steps
    pub max_steps: usize,
    /// Current step count
    pub steps: usize,
    expired: bool,
}

impl<E> TimeLimit<E> {
    /// Create a new time limit wrapper
    pub fn new(env: E, max_steps: usize) -> Self {
        Self {
            env,
            max_steps,
            steps: 0,
            expired: false,
        }
    }

    /// Unwrap the inner environment
    pub fn into_inner(self) -> E {
        self.env
    }
}

impl<E: Environment> Environment for TimeLimit<E> {
    type Action = E::Action;

    fn schema(&self) -> &Arc<Schema> {
        self.env.schema()
    }

    fn reset(&mut self) -> Result<State> {
        self.steps = 0;
        self.expired = false;
        self.env.reset()
    }

    fn reset_to(&mut self, state: State) -> Result<State> {
        self.steps = 0;
        self.expired = false;
        self.env.reset_to(state)
    }

    fn step(&mut self, action: Self::Action) -> Result<Step> {
        if self.expired {
            return Err(OomdpError::Environment(
                "time limit reached; call reset".into(),
            ));
        }
        self.steps += 1;
        let mut step = self.env.step(action)?;

        if self.steps >= self.max_steps && !step.done {
            tracing::debug!(steps = self.steps, "episode truncated by time limit");
            step.truncated = true;
            step.done = true;
            self.expired = true;
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
        self.env.episode_info()
    }
}
