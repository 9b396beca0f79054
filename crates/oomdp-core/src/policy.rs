//! Policies: mappings from states to actions

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::marker::PhantomData;

use crate::{Action, OomdpError, Result, State};

/// Policy trait
pub trait Policy {
    /// Action type
    type Action: Action;

    /// Select an action given a state
    fn select(&mut self, state: &State) -> Result<Self::Action>;
}

/// Uniformly random policy over an action set, driven by a seeded source
#[derive(Debug, Clone)]
pub struct RandomPolicy<A> {
    rng: StdRng,
    _action: PhantomData<A>,
}

impl<A: Action> RandomPolicy<A> {
    /// Create a policy from a seed
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            _action: PhantomData,
        }
    }
}

impl<A: Action> Policy for RandomPolicy<A> {
    type Action = A;

    fn select(&mut self, _state: &State) -> Result<A> {
        A::all()
            .choose(&mut self.rng)
            .copied()
            .ok_or_else(|| OomdpError::IllegalAction("empty action set".into()))
    }
}
