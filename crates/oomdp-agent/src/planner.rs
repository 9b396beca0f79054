//! R-Max value iteration over the learned model
//!
//! The planner keeps a sparse table of the states it has imagined so far.
//! Each node caches its signature and, per action, the predicted successor
//! and the looked-up reward. An action whose outcome is unknown backs up as
//! `r_max + γ·V(s)`, a self-loop paying the maximum reward, which pulls the
//! agent towards whatever it has not yet learned.
//!
//! When the learner or reward model revises an action, only that action's
//! outcomes are recomputed; nodes whose outcomes changed, and then their
//! predecessors, are backed up from a worklist.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use oomdp_core::{
    greedy_index, Action, ActionValueFunction, Budget, OomdpError, Policy, Result,
    RewardOutcome, Signature, State,
};

use crate::learner::DoorMaxLearner;
use crate::reward_model::RewardModel;

/// Planner configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Discount factor in `[0, 1)`
    pub gamma: f64,
    /// Reward assumed for unknown state–actions
    pub r_max: f64,
    /// Bellman residual below which values count as converged
    pub tolerance: f64,
    /// Sweep cap for full value iteration; backups per state for updates
    pub max_iterations: usize,
    /// Cap on imagined states; successors beyond it count as unknown
    pub max_states: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            gamma: 0.95,
            r_max: 20.0,
            tolerance: 1e-6,
            max_iterations: 10_000,
            max_states: 100_000,
        }
    }
}

impl PlannerConfig {
    /// Reject out-of-range parameters
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(OomdpError::Config(format!(
                "gamma must lie in [0, 1), got {}",
                self.gamma
            )));
        }
        if !self.r_max.is_finite() {
            return Err(OomdpError::Config("r_max must be finite".into()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(OomdpError::Config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 || self.max_states == 0 {
            return Err(OomdpError::Config(
                "max_iterations and max_states must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Value of a state where every action is unknown
    #[must_use]
    pub fn optimistic_value(&self) -> f64 {
        self.r_max / (1.0 - self.gamma)
    }
}

/// Imagined outcome of one action in one state
#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Unknown,
    Terminal { reward: f64 },
    Step { reward: f64, next: usize },
}

#[derive(Debug, Clone)]
struct Node {
    state: State,
    signature: Signature,
    successors: Vec<Option<usize>>,
    rewards: Vec<Option<RewardOutcome>>,
    outcomes: Vec<Outcome>,
    q: Vec<f64>,
    value: f64,
    predecessors: BTreeSet<usize>,
}

/// Summary of a full value-iteration run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationReport {
    /// Sweeps performed
    pub sweeps: usize,
    /// Largest value change in the last sweep
    pub residual: f64,
    /// Whether the residual fell below tolerance
    pub converged: bool,
    /// States in the table
    pub states: usize,
}

/// R-Max planner over a DOORmax learner and a reward model
#[derive(Debug)]
pub struct RMaxPlanner<A, R> {
    learner: DoorMaxLearner<A>,
    rewards: R,
    config: PlannerConfig,
    nodes: Vec<Node>,
    index: IndexMap<State, usize>,
    synced_learner: Vec<u64>,
    synced_rewards: Vec<u64>,
    unexpanded: VecDeque<usize>,
    pending: BTreeSet<usize>,
    budget: Budget,
    capped: bool,
}

/// Planner over `learner` and `reward_table`
pub fn make_planner<A, R>(
    learner: DoorMaxLearner<A>,
    reward_table: R,
    gamma: f64,
    r_max: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<RMaxPlanner<A, R>>
where
    A: Action,
    R: RewardModel<Action = A>,
{
    RMaxPlanner::new(
        learner,
        reward_table,
        PlannerConfig {
            gamma,
            r_max,
            tolerance,
            max_iterations,
            ..PlannerConfig::default()
        },
    )
}

impl<A, R> RMaxPlanner<A, R>
where
    A: Action,
    R: RewardModel<Action = A>,
{
    /// Create a planner with an empty state table
    pub fn new(learner: DoorMaxLearner<A>, rewards: R, config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            learner,
            rewards,
            config,
            nodes: Vec::new(),
            index: IndexMap::new(),
            synced_learner: vec![0; A::count()],
            synced_rewards: vec![0; A::count()],
            unexpanded: VecDeque::new(),
            pending: BTreeSet::new(),
            budget: Budget::unlimited(),
            capped: false,
        })
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// The transition learner
    #[must_use]
    pub fn learner(&self) -> &DoorMaxLearner<A> {
        &self.learner
    }

    /// Mutable access for feeding observations
    pub fn learner_mut(&mut self) -> &mut DoorMaxLearner<A> {
        &mut self.learner
    }

    /// The reward model
    #[must_use]
    pub fn rewards(&self) -> &R {
        &self.rewards
    }

    /// Mutable access for recording rewards
    pub fn rewards_mut(&mut self) -> &mut R {
        &mut self.rewards
    }

    /// Attach a cancellation budget; each backup costs one unit
    pub fn set_budget(&mut self, budget: Budget) {
        self.budget = budget;
    }

    /// Number of imagined states
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.nodes.len()
    }

    /// `V(state)`, if the state is in the table
    #[must_use]
    pub fn value(&self, state: &State) -> Option<f64> {
        self.index.get(state).map(|&id| self.nodes[id].value)
    }

    /// Every state with its Q-values, in the order states were first imagined
    pub fn q_table(&self) -> impl Iterator<Item = (&State, &[f64])> + '_ {
        self.nodes.iter().map(|n| (&n.state, n.q.as_slice()))
    }

    /// Whether the outcome of `action` in `state` is known to the planner,
    /// after catching up with any revised action. `None` if the state was
    /// never imagined.
    pub fn is_known(&mut self, state: &State, action: A) -> Result<Option<bool>> {
        self.refresh()?;
        let Some(&id) = self.index.get(state) else {
            return Ok(None);
        };
        Ok(self.nodes[id]
            .outcomes
            .get(action.index())
            .map(|o| *o != Outcome::Unknown))
    }

    /// Greedy action for `state` after bringing values up to date
    pub fn act(&mut self, state: &State) -> Result<A> {
        let id = self.ensure(state)?;
        self.update()?;
        let index = greedy_index(&self.nodes[id].q)
            .ok_or_else(|| OomdpError::IllegalAction("empty action set".into()))?;
        A::from_index(index)
            .ok_or_else(|| OomdpError::IllegalAction(format!("action index {index} out of range")))
    }

    /// Add `state` (and everything the model predicts from it) to the table
    pub fn ensure(&mut self, state: &State) -> Result<usize> {
        let id = match self.index.get(state) {
            Some(&id) => id,
            None => self.insert(state.clone()),
        };
        self.refresh()?;
        Ok(id)
    }

    /// Re-evaluate revised actions and back up changed values
    pub fn update(&mut self) -> Result<()> {
        self.refresh()?;

        let cap = self.config.max_iterations.saturating_mul(self.nodes.len().max(1));
        let mut backups = 0usize;
        while let Some(id) = self.pending.pop_first() {
            if backups >= cap {
                tracing::warn!(backups, pending = self.pending.len() + 1, "backup cap reached");
                self.pending.clear();
                break;
            }
            if let Err(e) = self.budget.charge(1) {
                self.pending.insert(id);
                return Err(e);
            }
            backups += 1;
            let delta = self.backup(id);
            if delta > self.config.tolerance {
                let node = &self.nodes[id];
                self.pending.extend(node.predecessors.iter().copied());
                if node.outcomes.contains(&Outcome::Unknown) {
                    self.pending.insert(id);
                }
            }
        }
        tracing::trace!(backups, states = self.nodes.len(), "incremental update");
        Ok(())
    }

    /// Full Gauss–Seidel sweeps until the residual is below tolerance
    pub fn run_value_iteration(&mut self) -> Result<IterationReport> {
        self.refresh()?;
        let mut report = IterationReport {
            sweeps: 0,
            residual: 0.0,
            converged: false,
            states: self.nodes.len(),
        };
        while report.sweeps < self.config.max_iterations {
            let mut residual: f64 = 0.0;
            for id in 0..self.nodes.len() {
                self.budget.charge(1)?;
                residual = residual.max(self.backup(id));
            }
            report.sweeps += 1;
            report.residual = residual;
            if residual < self.config.tolerance {
                report.converged = true;
                break;
            }
        }
        if !report.converged {
            tracing::warn!(sweeps = report.sweeps, residual = report.residual, "value iteration hit the sweep cap");
        }
        self.pending.clear();
        Ok(report)
    }

    fn insert(&mut self, state: State) -> usize {
        let id = self.nodes.len();
        let actions = A::count();
        let optimistic = self.config.optimistic_value();
        self.nodes.push(Node {
            signature: Signature::of(&state),
            state: state.clone(),
            successors: vec![None; actions],
            rewards: vec![None; actions],
            outcomes: vec![Outcome::Unknown; actions],
            q: vec![optimistic; actions],
            value: optimistic,
            predecessors: BTreeSet::new(),
        });
        self.index.insert(state, id);
        self.unexpanded.push_back(id);
        id
    }

    /// Table id of a predicted successor, or `None` beyond the state cap
    fn intern(&mut self, state: State) -> Option<usize> {
        if let Some(&id) = self.index.get(&state) {
            return Some(id);
        }
        if self.nodes.len() >= self.config.max_states {
            if !self.capped {
                tracing::warn!(max_states = self.config.max_states, "planner state table full");
                self.capped = true;
            }
            return None;
        }
        Some(self.insert(state))
    }

    fn refresh(&mut self) -> Result<()> {
        for (a, &action) in A::all().iter().enumerate() {
            let learner_revision = self.learner.revision(action);
            let reward_revision = self.rewards.revision(action);
            let transitions = learner_revision != self.synced_learner[a];
            let rewards = reward_revision != self.synced_rewards[a];
            if !(transitions || rewards) {
                continue;
            }
            tracing::debug!(
                action = action.name(),
                transitions,
                rewards,
                states = self.nodes.len(),
                "re-planning revised action"
            );
            let known = self.nodes.len();
            for id in 0..known {
                self.evaluate(id, a, transitions, rewards)?;
            }
            self.synced_learner[a] = learner_revision;
            self.synced_rewards[a] = reward_revision;
        }

        while let Some(id) = self.unexpanded.pop_front() {
            for a in 0..A::count() {
                self.evaluate(id, a, true, true)?;
            }
        }
        Ok(())
    }

    fn evaluate(&mut self, id: usize, a: usize, transition: bool, reward: bool) -> Result<()> {
        let Some(action) = A::from_index(a) else {
            return Ok(());
        };
        if transition {
            let node = &self.nodes[id];
            let predicted = self.learner.predict_with(&node.state, &node.signature, action)?;
            let successor = predicted.and_then(|next| self.intern(next));
            self.nodes[id].successors[a] = successor;
        }
        if reward {
            let node = &self.nodes[id];
            let looked_up = self.rewards.lookup(&node.state, &node.signature, action);
            self.nodes[id].rewards[a] = looked_up;
        }

        let node = &self.nodes[id];
        let outcome = match (node.rewards[a], node.successors[a]) {
            (Some(r), _) if r.terminal => Outcome::Terminal { reward: r.reward.0 },
            (Some(r), Some(next)) => Outcome::Step {
                reward: r.reward.0,
                next,
            },
            _ => Outcome::Unknown,
        };
        if outcome != node.outcomes[a] {
            let previous = std::mem::replace(&mut self.nodes[id].outcomes[a], outcome);
            if let Outcome::Step { next: old, .. } = previous {
                let linked = self.nodes[id]
                    .outcomes
                    .iter()
                    .any(|o| matches!(o, Outcome::Step { next, .. } if *next == old));
                if !linked {
                    self.nodes[old].predecessors.remove(&id);
                }
            }
            if let Outcome::Step { next, .. } = outcome {
                self.nodes[next].predecessors.insert(id);
            }
            self.pending.insert(id);
        }
        Ok(())
    }

    /// Bellman backup of one node; returns `|ΔV|`
    fn backup(&mut self, id: usize) -> f64 {
        let gamma = self.config.gamma;
        let node = &self.nodes[id];
        let current = node.value;
        let q: Vec<f64> = node
            .outcomes
            .iter()
            .map(|outcome| match *outcome {
                Outcome::Unknown => self.config.r_max + gamma * current,
                Outcome::Terminal { reward } => reward,
                Outcome::Step { reward, next } => reward + gamma * self.nodes[next].value,
            })
            .collect();
        let value = q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let node = &mut self.nodes[id];
        node.q = q;
        node.value = value;
        (value - current).abs()
    }
}

impl<A, R> Policy for RMaxPlanner<A, R>
where
    A: Action,
    R: RewardModel<Action = A>,
{
    type Action = A;

    fn select(&mut self, state: &State) -> Result<A> {
        self.act(state)
    }
}

impl<A, R> ActionValueFunction for RMaxPlanner<A, R>
where
    A: Action,
    R: RewardModel<Action = A>,
{
    type Action = A;

    fn q_values(&self, state: &State) -> Option<Vec<f64>> {
        self.index.get(state).map(|&id| self.nodes[id].q.clone())
    }
}
