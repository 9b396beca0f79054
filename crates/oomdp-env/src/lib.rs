//! Object-oriented environments
//!
//! This crate provides:
//! - the Taxi domain with text-map layouts
//! - a time limit wrapper
//! - a registry for creating environments by name

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod layout;
pub mod registry;
pub mod taxi;
pub mod wrappers;

// Re-export environments
pub use layout::{Side, Stop, TaxiLayout, WallSegment, SMALL_LAYOUT, STANDARD_LAYOUT};
pub use registry::{list_envs, make_env, register_env, BoxedTaxiEnv, EnvRegistry};
pub use taxi::{
    make_environment, taxi_schema, TaxiAction, TaxiConfig, TaxiCosts, TaxiEnv, TaxiStart,
    DESTINATION, PASSENGER, TAXI,
};
pub use wrappers::TimeLimit;

// Re-export core types
pub use oomdp_core::{Environment, Episode, State, Step};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{make_env, make_environment, TaxiAction, TaxiConfig, TaxiEnv, TimeLimit};
    pub use oomdp_core::prelude::*;
}
