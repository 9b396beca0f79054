//! Object-oriented MDP world model
//!
//! This crate provides the typed world representation shared by OO-MDP
//! environments and learners:
//! - a schema registry of object classes, attribute domains and relations
//! - immutable, structurally hashed states
//! - a relation evaluator producing ordered propositions
//! - lifted conditions and the closed set of attribute effect kinds
//! - environment, agent and policy traits, plus a cancellation budget

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod agent;
pub mod budget;
pub mod condition;
pub mod config;
pub mod effect;
pub mod environment;
pub mod error;
pub mod policy;
pub mod relation;
pub mod reward;
pub mod schema;
pub mod state;
pub mod trajectory;
pub mod value;

// Re-export core traits and types
pub use action::{parse_action, Action, DiscreteAction, DiscreteSpace};
pub use agent::{Agent, AgentMetrics};
pub use budget::Budget;
pub use condition::{Condition, Signature, Term, TermArg};
pub use config::JsonConfig;
pub use effect::{Effect, EffectKind};
pub use environment::{Environment, Episode, Step, StepInfo, TrackedEnvironment};
pub use error::{OomdpError, Result, SchemaError};
pub use policy::{Policy, RandomPolicy};
pub use relation::{propositions, Proposition};
pub use reward::{Reward, RewardOutcome};
pub use schema::{
    AttributeDecl, ClassDecl, ClassId, Domain, Relation, RelationDecl, RelationId, Schema,
    SchemaBuilder,
};
pub use state::{ObjectId, ObjectInstance, ObjectView, State, StateBuilder, Value};
pub use trajectory::{Trajectory, Transition};
pub use value::{greedy_index, ActionValueFunction};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, Agent, Budget, Condition, Domain, EffectKind, Environment, JsonConfig, ObjectId,
        OomdpError, Policy, Result, Reward, Schema, SchemaBuilder, Signature, State, Step,
        Transition,
    };
}
