//! The Taxi domain as an object-oriented MDP
//!
//! Objects: one taxi, one passenger, one destination and one wall object
//! per blocked cell side. Relations: `touch_n/s/e/w(taxi, wall)`,
//! `on_passenger(taxi, passenger)`, `on_destination(taxi, destination)` and
//! `in_taxi(passenger)`. Positions are `(col, row)` with row 0 at the top.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use oomdp_core::{
    Action, Budget, Domain, Environment, ObjectId, OomdpError, Result, Reward, Schema,
    SchemaBuilder, State, Step, StepInfo, Value,
};

use crate::layout::{Side, TaxiLayout};

/// Id of the taxi object
pub const TAXI: ObjectId = ObjectId(0);
/// Id of the passenger object
pub const PASSENGER: ObjectId = ObjectId(1);
/// Id of the destination object
pub const DESTINATION: ObjectId = ObjectId(2);
/// Id of the first wall object
pub const FIRST_WALL: u32 = 3;

/// Taxi actions in enumeration (and tie-breaking) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaxiAction {
    /// Row − 1
    North,
    /// Row + 1
    South,
    /// Col + 1
    East,
    /// Col − 1
    West,
    /// Load the passenger
    Pickup,
    /// Unload the passenger
    Dropoff,
}

impl TaxiAction {
    fn side(self) -> Option<Side> {
        match self {
            Self::North => Some(Side::North),
            Self::South => Some(Side::South),
            Self::East => Some(Side::East),
            Self::West => Some(Side::West),
            Self::Pickup | Self::Dropoff => None,
        }
    }
}

impl Action for TaxiAction {
    fn all() -> &'static [Self] {
        &[
            Self::North,
            Self::South,
            Self::East,
            Self::West,
            Self::Pickup,
            Self::Dropoff,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            Self::North => "North",
            Self::South => "South",
            Self::East => "East",
            Self::West => "West",
            Self::Pickup => "Pickup",
            Self::Dropoff => "Dropoff",
        }
    }
}

impl fmt::Display for TaxiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaxiAction {
    type Err = OomdpError;

    fn from_str(s: &str) -> Result<Self> {
        oomdp_core::parse_action(s)
    }
}

/// Rewards of the Taxi domain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxiCosts {
    /// Every legal step
    pub step: f64,
    /// Pickup or dropoff that does nothing
    pub illegal: f64,
    /// Successful dropoff, which ends the episode
    pub delivery: f64,
}

impl Default for TaxiCosts {
    fn default() -> Self {
        Self {
            step: -1.0,
            illegal: -10.0,
            delivery: 20.0,
        }
    }
}

/// Taxi environment configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxiConfig {
    /// Seed of the episode-start random source
    pub seed: u64,
    /// Reward table
    pub costs: TaxiCosts,
    /// Text map; the standard layout when absent
    pub layout: Option<String>,
}

/// Explicit episode start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxiStart {
    /// Taxi `(col, row)`
    pub taxi: (Value, Value),
    /// Stop letter where the passenger waits
    pub passenger: char,
    /// Stop letter of the destination
    pub destination: char,
    /// Whether the passenger is already aboard
    pub in_taxi: bool,
}

impl TaxiStart {
    /// Passenger waiting at a stop, taxi empty
    #[must_use]
    pub fn new(taxi: (Value, Value), passenger: char, destination: char) -> Self {
        Self {
            taxi,
            passenger,
            destination,
            in_taxi: false,
        }
    }
}

/// Build the Taxi schema for a layout
pub fn taxi_schema(layout: &TaxiLayout) -> Result<Arc<Schema>> {
    let cols = Domain::range(0, layout.width());
    let rows = Domain::range(0, layout.height());
    let same_cell = |a: &oomdp_core::ObjectView<'_>, b: &oomdp_core::ObjectView<'_>| {
        a.get("col") == b.get("col") && a.get("row") == b.get("row")
    };
    let touching = move |side: Side| {
        move |args: &[oomdp_core::ObjectView<'_>]| {
            same_cell(&args[0], &args[1]) && args[1].get("side") == Some(side.code())
        }
    };

    let schema = SchemaBuilder::new("taxi")
        .class("taxi")
        .attribute("col", cols.clone())
        .attribute("row", rows.clone())
        .and()
        .class("passenger")
        .attribute("col", cols.clone())
        .attribute("row", rows.clone())
        .boolean("in_taxi")
        .and()
        .class("destination")
        .attribute("col", cols.clone())
        .attribute("row", rows.clone())
        .and()
        .class("wall")
        .attribute("col", cols)
        .attribute("row", rows)
        .attribute("side", Domain::range(0, 4))
        .and()
        .relation("touch_n", &["taxi", "wall"], touching(Side::North))
        .relation("touch_s", &["taxi", "wall"], touching(Side::South))
        .relation("touch_e", &["taxi", "wall"], touching(Side::East))
        .relation("touch_w", &["taxi", "wall"], touching(Side::West))
        .relation("on_passenger", &["taxi", "passenger"], move |a| same_cell(&a[0], &a[1]))
        .relation("on_destination", &["taxi", "destination"], move |a| {
            same_cell(&a[0], &a[1])
        })
        .relation("in_taxi", &["passenger"], |a| a[0].flag("in_taxi"))
        .freeze()?;
    Ok(Arc::new(schema))
}

/// Taxi environment
pub struct TaxiEnv {
    layout: TaxiLayout,
    schema: Arc<Schema>,
    costs: TaxiCosts,
    rng: StdRng,
    state: Option<State>,
    finished: bool,
    budget: Budget,
}

/// Standard-layout Taxi environment with default costs
pub fn make_environment(seed: u64) -> Result<TaxiEnv> {
    TaxiEnv::new(&TaxiConfig {
        seed,
        ..TaxiConfig::default()
    })
}

impl TaxiEnv {
    /// Create an environment from a configuration
    pub fn new(config: &TaxiConfig) -> Result<Self> {
        let layout = match &config.layout {
            Some(map) => TaxiLayout::parse(map)?,
            None => TaxiLayout::standard()?,
        };
        let schema = taxi_schema(&layout)?;
        Ok(Self {
            layout,
            schema,
            costs: config.costs,
            rng: StdRng::seed_from_u64(config.seed),
            state: None,
            finished: false,
            budget: Budget::unlimited(),
        })
    }

    /// Grid layout
    #[must_use]
    pub fn layout(&self) -> &TaxiLayout {
        &self.layout
    }

    /// Reward table
    #[must_use]
    pub fn costs(&self) -> TaxiCosts {
        self.costs
    }

    /// Build the state for an explicit start
    pub fn start_state(&self, start: &TaxiStart) -> Result<State> {
        let stop = |name: char| {
            self.layout
                .stop(name)
                .ok_or_else(|| OomdpError::InvalidState(format!("no stop `{name}` in layout")))
        };
        let passenger = stop(start.passenger)?;
        let destination = stop(start.destination)?;
        let mut builder = State::builder(&self.schema)
            .object(TAXI.0, "taxi", &[("col", start.taxi.0), ("row", start.taxi.1)])
            .object(
                PASSENGER.0,
                "passenger",
                &[
                    ("col", passenger.col),
                    ("row", passenger.row),
                    ("in_taxi", Value::from(start.in_taxi)),
                ],
            )
            .object(
                DESTINATION.0,
                "destination",
                &[("col", destination.col), ("row", destination.row)],
            );
        for (offset, wall) in (0u32..).zip(self.layout.walls()) {
            builder = builder.object(
                FIRST_WALL + offset,
                "wall",
                &[("col", wall.col), ("row", wall.row), ("side", wall.side.code())],
            );
        }
        builder.build()
    }

    /// Every state with the passenger at a stop and a distinct destination
    pub fn all_states(&self) -> Result<Vec<State>> {
        let mut states = Vec::new();
        for passenger in self.layout.stops() {
            for destination in self.layout.stops() {
                if passenger.name == destination.name {
                    continue;
                }
                for row in 0..self.layout.height() {
                    for col in 0..self.layout.width() {
                        for in_taxi in [false, true] {
                            states.push(self.start_state(&TaxiStart {
                                taxi: (col, row),
                                passenger: passenger.name,
                                destination: destination.name,
                                in_taxi,
                            })?);
                        }
                    }
                }
            }
        }
        Ok(states)
    }

    fn position(state: &State, id: ObjectId) -> Result<(Value, Value)> {
        let missing = || OomdpError::InvalidState(format!("object {id} has no position"));
        Ok((
            state.get(id, "col").ok_or_else(missing)?,
            state.get(id, "row").ok_or_else(missing)?,
        ))
    }

    fn transition(&self, state: &State, action: TaxiAction) -> Result<(State, f64, bool, &'static str)> {
        let taxi = Self::position(state, TAXI)?;
        let passenger = Self::position(state, PASSENGER)?;
        let destination = Self::position(state, DESTINATION)?;
        let in_taxi = state.get(PASSENGER, "in_taxi").unwrap_or_default() != 0;

        if let Some(side) = action.side() {
            let (col, row) = self.layout.move_from(taxi.0, taxi.1, side);
            if (col, row) == taxi {
                return Ok((state.clone(), self.costs.step, false, "bump"));
            }
            let next = state.with_value(TAXI, "col", col)?.with_value(TAXI, "row", row)?;
            return Ok((next, self.costs.step, false, "move"));
        }

        match action {
            TaxiAction::Pickup if !in_taxi && taxi == passenger => {
                let next = state.with_value(PASSENGER, "in_taxi", 1)?;
                Ok((next, self.costs.step, false, "pickup"))
            }
            TaxiAction::Dropoff if in_taxi && taxi == destination => {
                Ok((state.clone(), self.costs.delivery, true, "delivery"))
            }
            TaxiAction::Pickup => Ok((state.clone(), self.costs.illegal, false, "illegal_pickup")),
            _ => Ok((state.clone(), self.costs.illegal, false, "illegal_dropoff")),
        }
    }
}

impl Environment for TaxiEnv {
    type Action = TaxiAction;

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn reset(&mut self) -> Result<State> {
        self.budget.charge(1)?;
        let stops = self.layout.stops();
        let taxi = (
            self.rng.gen_range(0..self.layout.width()),
            self.rng.gen_range(0..self.layout.height()),
        );
        let passenger = self.rng.gen_range(0..stops.len());
        let mut destination = self.rng.gen_range(0..stops.len() - 1);
        if destination >= passenger {
            destination += 1;
        }
        let start = TaxiStart::new(taxi, stops[passenger].name, stops[destination].name);
        let state = self.start_state(&start)?;
        tracing::debug!(?start, "taxi episode reset");
        self.state = Some(state.clone());
        self.finished = false;
        Ok(state)
    }

    fn reset_to(&mut self, state: State) -> Result<State> {
        self.budget.charge(1)?;
        let template = self.start_state(&TaxiStart::new(
            (0, 0),
            self.layout.stops()[0].name,
            self.layout.stops()[1].name,
        ))?;
        let walls_match = state
            .objects()
            .iter()
            .zip(template.objects())
            .skip(FIRST_WALL as usize)
            .all(|(a, b)| a == b);
        if !state.same_objects(&template) || !walls_match {
            return Err(OomdpError::InvalidState(
                "state does not match this taxi layout".into(),
            ));
        }
        self.state = Some(state.clone());
        self.finished = false;
        Ok(state)
    }

    fn step(&mut self, action: TaxiAction) -> Result<Step> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| OomdpError::Environment("step before reset".into()))?;
        if self.finished {
            return Err(OomdpError::Environment(
                "episode has terminated; call reset".into(),
            ));
        }
        self.budget.charge(1)?;

        let (next, reward, done, event) = self.transition(state, action)?;
        tracing::trace!(%action, reward, done, event, "taxi step");
        self.state = Some(next.clone());
        self.finished = done;
        Ok(Step {
            state: next,
            reward: Reward(reward),
            done,
            truncated: false,
            info: StepInfo::event(event),
        })
    }

    fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    fn set_budget(&mut self, budget: Budget) {
        self.budget = budget;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use oomdp_core::{propositions, DiscreteAction, Signature, TrackedEnvironment};
    use proptest::prelude::*;

    fn env_at(start: TaxiStart) -> (TaxiEnv, State) {
        let mut env = make_environment(0).unwrap();
        let state = env.start_state(&start).unwrap();
        env.reset_to(state.clone()).unwrap();
        (env, state)
    }

    #[test]
    fn test_move_into_wall() {
        let (mut env, start) = env_at(TaxiStart::new((0, 0), 'R', 'G'));
        let step = env.step(TaxiAction::West).unwrap();
        assert_eq!(step.state, start);
        assert_relative_eq!(step.reward.0, -1.0);
        assert!(!step.done);
        assert_eq!(step.info.event_name(), Some("bump"));
    }

    #[test]
    fn test_internal_wall_blocks() {
        let (mut env, start) = env_at(TaxiStart::new((1, 0), 'R', 'G'));
        let step = env.step(TaxiAction::East).unwrap();
        assert_eq!(step.state, start);
        let step = env.step(TaxiAction::West).unwrap();
        assert_eq!(step.state.get(TAXI, "col"), Some(0));
    }

    #[test]
    fn test_pickup_success() {
        let (mut env, start) = env_at(TaxiStart::new((0, 0), 'R', 'G'));
        let step = env.step(TaxiAction::Pickup).unwrap();
        assert_relative_eq!(step.reward.0, -1.0);
        assert_eq!(step.state.get(PASSENGER, "in_taxi"), Some(1));
        assert_eq!(step.state.get(PASSENGER, "col"), start.get(PASSENGER, "col"));
        assert_eq!(step.state.get(PASSENGER, "row"), start.get(PASSENGER, "row"));
    }

    #[test]
    fn test_pickup_failure() {
        let (mut env, start) = env_at(TaxiStart::new((2, 2), 'R', 'G'));
        let step = env.step(TaxiAction::Pickup).unwrap();
        assert_relative_eq!(step.reward.0, -10.0);
        assert_eq!(step.state, start);
    }

    #[test]
    fn test_delivery_terminates() {
        let mut start = TaxiStart::new((0, 4), 'R', 'G');
        start.in_taxi = true;
        let (mut env, _) = env_at(start);
        let step = env.step(TaxiAction::Dropoff).unwrap();
        assert_relative_eq!(step.reward.0, 20.0);
        assert!(step.done);
        assert!(matches!(env.step(TaxiAction::North), Err(OomdpError::Environment(_))));
    }

    #[test]
    fn test_wrong_dropoff() {
        let mut start = TaxiStart::new((0, 0), 'R', 'G');
        start.in_taxi = true;
        let (mut env, start) = env_at(start);
        let step = env.step(TaxiAction::Dropoff).unwrap();
        assert_relative_eq!(step.reward.0, -10.0);
        assert_eq!(step.state, start);
        assert!(!step.done);
    }

    #[test]
    fn test_illegal_symbol() {
        let (mut env, _) = env_at(TaxiStart::new((2, 2), 'R', 'G'));
        assert!(matches!(
            env.step_symbol(DiscreteAction(6)),
            Err(OomdpError::IllegalAction(_))
        ));
        assert!(env.step_symbol(DiscreteAction(0)).is_ok());
        assert!("Hover".parse::<TaxiAction>().is_err());
        assert_eq!("pickup".parse::<TaxiAction>().unwrap(), TaxiAction::Pickup);
    }

    #[test]
    fn test_reset_is_seeded_and_valid() {
        let mut a = make_environment(42).unwrap();
        let mut b = make_environment(42).unwrap();
        for _ in 0..50 {
            let s = a.reset().unwrap();
            assert_eq!(s, b.reset().unwrap());
            assert_eq!(s.get(PASSENGER, "in_taxi"), Some(0));
            assert_ne!(
                (s.get(PASSENGER, "col"), s.get(PASSENGER, "row")),
                (s.get(DESTINATION, "col"), s.get(DESTINATION, "row"))
            );
        }
    }

    #[test]
    fn test_relations_at_corner() {
        let env = make_environment(0).unwrap();
        let state = env.start_state(&TaxiStart::new((0, 0), 'R', 'G')).unwrap();
        let schema = env.schema();
        let mut names: Vec<String> = propositions(&state)
            .iter()
            .map(|p| schema.relation(p.relation).name.clone())
            .collect();
        names.dedup();
        assert_eq!(names, vec!["on_passenger", "touch_n", "touch_w"]);

        let signature = Signature::of(&state);
        let taxi_condition = signature.condition(TAXI).unwrap();
        assert_eq!(taxi_condition.len(), 6);
        assert_eq!(
            taxi_condition.literals().iter().filter(|(_, sign)| *sign).count(),
            3
        );
    }

    #[test]
    fn test_reset_to_rejects_other_layout() {
        let small = TaxiEnv::new(&TaxiConfig {
            layout: Some(crate::layout::SMALL_LAYOUT.to_string()),
            ..TaxiConfig::default()
        })
        .unwrap();
        let foreign = small.start_state(&TaxiStart::new((0, 0), 'R', 'G')).unwrap();
        let mut env = make_environment(0).unwrap();
        assert!(matches!(env.reset_to(foreign), Err(OomdpError::InvalidState(_))));
    }

    #[test]
    fn test_budget_cancels_steps() {
        let (mut env, _) = env_at(TaxiStart::new((2, 2), 'R', 'G'));
        env.set_budget(Budget::new(2));
        env.step(TaxiAction::North).unwrap();
        env.step(TaxiAction::North).unwrap();
        assert!(matches!(env.step(TaxiAction::North), Err(OomdpError::Cancelled)));
    }

    #[test]
    fn test_tracked_episode_totals() {
        let mut env = TrackedEnvironment::new(make_environment(1).unwrap());
        env.reset().unwrap();
        env.step(TaxiAction::Pickup).unwrap();
        env.step(TaxiAction::North).unwrap();
        let info = env.episode_info().unwrap();
        assert_eq!(info.id, 0);
        assert_eq!(info.steps, 2);
        env.reset().unwrap();
        assert_eq!(env.episode_info().unwrap().id, 1);
        assert_eq!(env.history.len(), 1);
    }

    #[test]
    fn test_all_states_count() {
        let env = make_environment(0).unwrap();
        // 25 cells, 4 × 3 stop pairs, passenger aboard or not
        assert_eq!(env.all_states().unwrap().len(), 25 * 12 * 2);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: TaxiConfig =
            serde_json::from_str(r#"{"seed": 4, "costs": {"illegal": -5.0}}"#).unwrap();
        assert_eq!(config.seed, 4);
        assert_relative_eq!(config.costs.illegal, -5.0);
        assert_relative_eq!(config.costs.delivery, 20.0);
        assert!(config.layout.is_none());

        let (mut env, _) = env_at(TaxiStart::new((2, 2), 'R', 'G'));
        env.costs = config.costs;
        assert_relative_eq!(env.step(TaxiAction::Pickup).unwrap().reward.0, -5.0);
    }

    proptest! {
        #[test]
        fn prop_attributes_stay_in_domain(seed in 0u64..1000, actions in proptest::collection::vec(0usize..6, 1..60)) {
            let mut env = make_environment(seed).unwrap();
            env.reset().unwrap();
            for index in actions {
                let step = env.step_symbol(DiscreteAction(index)).unwrap();
                // rebuilding through the validating builder re-checks every domain
                let rebuilt = env.start_state(&TaxiStart {
                    taxi: (step.state.get(TAXI, "col").unwrap(), step.state.get(TAXI, "row").unwrap()),
                    passenger: 'R',
                    destination: 'G',
                    in_taxi: step.state.get(PASSENGER, "in_taxi") == Some(1),
                });
                prop_assert!(rebuilt.is_ok());
                if step.done {
                    env.reset().unwrap();
                }
            }
        }
    }
}
