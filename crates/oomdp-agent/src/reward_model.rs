//! Reward models: last observed reward and termination per key

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use oomdp_core::{Action, Condition, RewardOutcome, Signature, State};

/// Observed rewards, queried by the planner
pub trait RewardModel {
    /// Action type
    type Action: Action;

    /// Store the outcome observed for `action` in `state`
    fn record(&mut self, state: &State, signature: &Signature, action: Self::Action, outcome: RewardOutcome);

    /// Outcome expected for `action` in `state`, if known
    fn lookup(&self, state: &State, signature: &Signature, action: Self::Action) -> Option<RewardOutcome>;

    /// Counter bumped whenever a lookup for `action` may have changed
    fn revision(&self, action: Self::Action) -> u64;

    /// Number of stored outcomes
    fn len(&self) -> usize;

    /// Whether nothing was recorded yet
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keyed table with per-action revisions
#[derive(Debug, Clone)]
struct Table<K, A> {
    entries: IndexMap<K, Vec<Option<RewardOutcome>>>,
    revisions: Vec<u64>,
    len: usize,
    _action: PhantomData<A>,
}

impl<K: std::hash::Hash + Eq, A: Action> Table<K, A> {
    fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            revisions: vec![0; A::count()],
            len: 0,
            _action: PhantomData,
        }
    }

    fn record(&mut self, key: K, action: A, outcome: RewardOutcome) {
        let row = self.entries.entry(key).or_insert_with(|| vec![None; A::count()]);
        let Some(slot) = row.get_mut(action.index()) else {
            return;
        };
        let previous = slot.replace(outcome);
        if previous.is_none() {
            self.len += 1;
        }
        if previous != Some(outcome) {
            if let Some(revision) = self.revisions.get_mut(action.index()) {
                *revision += 1;
            }
        }
    }

    fn lookup(&self, key: &K, action: A) -> Option<RewardOutcome> {
        self.entries.get(key)?.get(action.index()).copied().flatten()
    }

    fn revision(&self, action: A) -> u64 {
        self.revisions.get(action.index()).copied().unwrap_or_default()
    }
}

/// Rewards keyed by `(state, action)`
#[derive(Debug, Clone)]
pub struct StateRewardTable<A> {
    table: Table<State, A>,
}

impl<A: Action> StateRewardTable<A> {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self { table: Table::new() }
    }
}

impl<A: Action> Default for StateRewardTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> RewardModel for StateRewardTable<A> {
    type Action = A;

    fn record(&mut self, state: &State, _signature: &Signature, action: A, outcome: RewardOutcome) {
        self.table.record(state.clone(), action, outcome);
    }

    fn lookup(&self, state: &State, _signature: &Signature, action: A) -> Option<RewardOutcome> {
        self.table.lookup(state, action)
    }

    fn revision(&self, action: A) -> u64 {
        self.table.revision(action)
    }

    fn len(&self) -> usize {
        self.table.len
    }
}

/// Rewards keyed by `(global condition, action)`
///
/// States that agree on which relations hold anywhere share an entry, so
/// one observation covers every such state.
#[derive(Debug, Clone)]
pub struct ConditionRewardTable<A> {
    table: Table<Condition, A>,
}

impl<A: Action> ConditionRewardTable<A> {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self { table: Table::new() }
    }
}

impl<A: Action> Default for ConditionRewardTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> RewardModel for ConditionRewardTable<A> {
    type Action = A;

    fn record(&mut self, _state: &State, signature: &Signature, action: A, outcome: RewardOutcome) {
        self.table.record(signature.global().clone(), action, outcome);
    }

    fn lookup(&self, _state: &State, signature: &Signature, action: A) -> Option<RewardOutcome> {
        self.table.lookup(signature.global(), action)
    }

    fn revision(&self, action: A) -> u64 {
        self.table.revision(action)
    }

    fn len(&self) -> usize {
        self.table.len
    }
}

/// Which reward model an agent builds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardModelKind {
    /// [`StateRewardTable`]
    #[default]
    State,
    /// [`ConditionRewardTable`]
    Condition,
}

/// A reward model chosen at run time
#[derive(Debug, Clone)]
pub enum AnyRewardModel<A> {
    /// Keyed by state
    State(StateRewardTable<A>),
    /// Keyed by global condition
    Condition(ConditionRewardTable<A>),
}

impl<A: Action> AnyRewardModel<A> {
    /// Empty model of the given kind
    #[must_use]
    pub fn new(kind: RewardModelKind) -> Self {
        match kind {
            RewardModelKind::State => Self::State(StateRewardTable::new()),
            RewardModelKind::Condition => Self::Condition(ConditionRewardTable::new()),
        }
    }
}

impl<A: Action> RewardModel for AnyRewardModel<A> {
    type Action = A;

    fn record(&mut self, state: &State, signature: &Signature, action: A, outcome: RewardOutcome) {
        match self {
            Self::State(m) => m.record(state, signature, action, outcome),
            Self::Condition(m) => m.record(state, signature, action, outcome),
        }
    }

    fn lookup(&self, state: &State, signature: &Signature, action: A) -> Option<RewardOutcome> {
        match self {
            Self::State(m) => m.lookup(state, signature, action),
            Self::Condition(m) => m.lookup(state, signature, action),
        }
    }

    fn revision(&self, action: A) -> u64 {
        match self {
            Self::State(m) => m.revision(action),
            Self::Condition(m) => m.revision(action),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::State(m) => m.len(),
            Self::Condition(m) => m.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oomdp_core::{Domain, Schema, SchemaBuilder};
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    enum Press {
        Go,
    }

    impl Action for Press {
        fn all() -> &'static [Self] {
            &[Press::Go]
        }

        fn name(self) -> &'static str {
            "Go"
        }
    }

    fn schema() -> Arc<Schema> {
        Arc::new(
            SchemaBuilder::new("dial")
                .class("dial")
                .attribute("x", Domain::range(0, 10))
                .and()
                .relation("high", &["dial"], |a| a[0].get("x") > Some(5))
                .freeze()
                .unwrap(),
        )
    }

    fn dial(schema: &Arc<Schema>, x: i64) -> (State, Signature) {
        let state = State::builder(schema).object(0, "dial", &[("x", x)]).build().unwrap();
        let signature = Signature::of(&state);
        (state, signature)
    }

    #[test]
    fn test_state_table_is_exact() {
        let schema = schema();
        let mut table = StateRewardTable::new();
        let (s1, g1) = dial(&schema, 1);
        let (s2, g2) = dial(&schema, 2);
        table.record(&s1, &g1, Press::Go, RewardOutcome::new(-1.0, false));
        assert_eq!(table.lookup(&s1, &g1, Press::Go), Some(RewardOutcome::new(-1.0, false)));
        assert_eq!(table.lookup(&s2, &g2, Press::Go), None);
    }

    #[test]
    fn test_condition_table_generalises() {
        let schema = schema();
        let mut table = ConditionRewardTable::new();
        let (s7, g7) = dial(&schema, 7);
        let (s9, g9) = dial(&schema, 9);
        let (s1, g1) = dial(&schema, 1);
        table.record(&s7, &g7, Press::Go, RewardOutcome::new(20.0, true));
        assert_eq!(table.lookup(&s9, &g9, Press::Go), Some(RewardOutcome::new(20.0, true)));
        assert_eq!(table.lookup(&s1, &g1, Press::Go), None);
    }

    #[test]
    fn test_revision_only_on_change() {
        let schema = schema();
        let mut model = AnyRewardModel::new(RewardModelKind::State);
        let (s, g) = dial(&schema, 3);
        model.record(&s, &g, Press::Go, RewardOutcome::new(-1.0, false));
        model.record(&s, &g, Press::Go, RewardOutcome::new(-1.0, false));
        assert_eq!(model.revision(Press::Go), 1);
        model.record(&s, &g, Press::Go, RewardOutcome::new(-10.0, false));
        assert_eq!(model.revision(Press::Go), 2);
        assert_eq!(model.len(), 1);
    }
}
