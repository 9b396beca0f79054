//! Model-based agents for object-oriented MDPs
//!
//! This crate provides:
//! - DOORmax, which learns attribute effects and their preconditions
//! - reward models keyed by state or by global condition
//! - an R-Max planner doing incremental value iteration on the learned model
//! - the DOORmax agent, Q-learning and random baselines, and episode/session runners

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod effect_model;
pub mod learner;
pub mod planner;
pub mod precondition;
pub mod qlearner;
pub mod random;
pub mod reward_model;
pub mod session;

// Re-export agents
pub use agent::{DoorMaxAgent, DoorMaxConfig, TrainingSummary};
pub use qlearner::{QLearnerAgent, QLearnerConfig};
pub use random::RandomAgent;

// Re-export learning components
pub use effect_model::{EffectKey, EffectModel, EffectRecord, Status};
pub use learner::{make_learner, DoorMaxLearner, LearnerConfig};
pub use precondition::{Precondition, PreconditionChange};
pub use reward_model::{
    AnyRewardModel, ConditionRewardTable, RewardModel, RewardModelKind, StateRewardTable,
};

// Re-export planning and sessions
pub use planner::{make_planner, IterationReport, PlannerConfig, RMaxPlanner};
pub use session::{run_attempt, run_episode, run_training_session, Attempt, GreedyAgent, Probe};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        run_episode, DoorMaxAgent, DoorMaxConfig, DoorMaxLearner, GreedyAgent, PlannerConfig,
        Probe, QLearnerAgent, QLearnerConfig, RandomAgent, RewardModelKind, RMaxPlanner,
    };
    pub use oomdp_core::prelude::*;
}
