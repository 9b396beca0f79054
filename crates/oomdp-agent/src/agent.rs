//! The DOORmax agent: act greedily on the R-Max plan, learn from every step

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use oomdp_core::{
    Action, Agent, AgentMetrics, Budget, Environment, Result, RewardOutcome, Schema, Signature,
    State, Trajectory, Transition,
};

use crate::learner::{DoorMaxLearner, LearnerConfig};
use crate::planner::{PlannerConfig, RMaxPlanner};
use crate::reward_model::{AnyRewardModel, RewardModel, RewardModelKind};
use crate::session::{run_attempt, run_episode, Attempt, GreedyAgent, Probe};

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorMaxConfig {
    /// Learner settings
    pub learner: LearnerConfig,
    /// Planner settings
    pub planner: PlannerConfig,
    /// Reward model to build
    pub reward_model: RewardModelKind,
    /// Step cap of a training episode
    pub max_episode_steps: usize,
}

impl Default for DoorMaxConfig {
    fn default() -> Self {
        Self {
            learner: LearnerConfig::default(),
            planner: PlannerConfig::default(),
            reward_model: RewardModelKind::default(),
            max_episode_steps: 1000,
        }
    }
}

/// Outcome of [`DoorMaxAgent::train`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrainingSummary {
    /// Episodes started
    pub episodes: usize,
    /// Environment steps taken
    pub steps: usize,
    /// Episodes the environment terminated
    pub completed: usize,
    /// Undiscounted reward over all episodes
    pub total_reward: f64,
}

/// DOORmax agent
pub struct DoorMaxAgent<A: Action> {
    planner: RMaxPlanner<A, AnyRewardModel<A>>,
    config: DoorMaxConfig,
    metrics: AgentMetrics,
}

impl<A: Action> DoorMaxAgent<A> {
    /// Create an agent that knows nothing about `schema`'s dynamics
    pub fn new(schema: &Arc<Schema>, config: DoorMaxConfig) -> Result<Self> {
        let learner = DoorMaxLearner::new(schema, config.learner);
        let rewards = AnyRewardModel::new(config.reward_model);
        let planner = RMaxPlanner::new(learner, rewards, config.planner)?;
        Ok(Self {
            planner,
            config,
            metrics: AgentMetrics::default(),
        })
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &DoorMaxConfig {
        &self.config
    }

    /// The planner, with its learner and reward model
    #[must_use]
    pub fn planner(&self) -> &RMaxPlanner<A, AnyRewardModel<A>> {
        &self.planner
    }

    /// Mutable planner access
    pub fn planner_mut(&mut self) -> &mut RMaxPlanner<A, AnyRewardModel<A>> {
        &mut self.planner
    }

    /// The transition learner
    #[must_use]
    pub fn learner(&self) -> &DoorMaxLearner<A> {
        self.planner.learner()
    }

    /// Share one cancellation budget between learner and planner
    pub fn set_budget(&mut self, budget: &Budget) {
        self.planner.learner_mut().set_budget(budget.clone());
        self.planner.set_budget(budget.clone());
    }

    /// Feed one transition to the learner and the reward model
    pub fn learn(&mut self, transition: &Transition<A>) -> Result<()> {
        let signature = Signature::of(&transition.state);
        self.planner.learner_mut().observe_with(
            &transition.state,
            &signature,
            transition.action,
            &transition.next_state,
            transition.reward,
        )?;
        let outcome = RewardOutcome::new(transition.reward, transition.done && !transition.truncated);
        self.planner
            .rewards_mut()
            .record(&transition.state, &signature, transition.action, outcome);
        Ok(())
    }

    /// One learning episode from a reset, capped at `max_episode_steps`
    pub fn run_episode<E>(&mut self, env: &mut E) -> Result<Trajectory<A>>
    where
        E: Environment<Action = A>,
    {
        let max_steps = self.config.max_episode_steps;
        run_episode(self, env, None, max_steps)
    }

    /// Learn for `total_steps` environment steps, episode after episode
    pub fn train<E>(&mut self, env: &mut E, total_steps: usize) -> Result<TrainingSummary>
    where
        E: Environment<Action = A>,
    {
        let mut summary = TrainingSummary::default();
        while summary.steps < total_steps {
            let max_steps = self.config.max_episode_steps.min(total_steps - summary.steps);
            let trajectory = run_episode(self, env, None, max_steps)?;
            summary.episodes += 1;
            summary.steps += trajectory.len();
            summary.total_reward += trajectory.total_reward;
            if trajectory.terminated() {
                summary.completed += 1;
            }
            if trajectory.is_empty() {
                break;
            }
        }
        tracing::info!(
            episodes = summary.episodes,
            steps = summary.steps,
            completed = summary.completed,
            states = self.planner.state_count(),
            "training finished"
        );
        Ok(summary)
    }

    /// Greedy roll-out from a probe's start, without learning
    pub fn attempt<E>(&mut self, env: &mut E, probe: &Probe) -> Result<Attempt<A>>
    where
        E: Environment<Action = A>,
    {
        run_attempt(self, env, probe)
    }
}

impl<A: Action> GreedyAgent for DoorMaxAgent<A> {
    fn greedy(&mut self, state: &State) -> Result<A> {
        self.planner.act(state)
    }
}

impl<A: Action> Agent for DoorMaxAgent<A> {
    type Action = A;

    fn act(&mut self, state: &State) -> Result<A> {
        let action = self.planner.act(state)?;
        #[allow(clippy::cast_precision_loss)]
        let states = self.planner.state_count() as f64;
        metrics::gauge!("oomdp_planner_states", states);
        Ok(action)
    }

    fn observe(&mut self, transition: &Transition<A>) -> Result<()> {
        self.learn(transition)?;
        self.metrics.total_steps += 1;
        metrics::increment_counter!("oomdp_agent_steps_total");
        tracing::trace!(
            action = transition.action.name(),
            reward = transition.reward.0,
            done = transition.done,
            "agent step"
        );
        Ok(())
    }

    fn end_episode(&mut self, total_reward: f64) {
        self.metrics.record_episode(total_reward);
        metrics::increment_counter!("oomdp_agent_episodes_total");
    }

    fn metrics(&self) -> AgentMetrics {
        let mut metrics = self.metrics.clone();
        metrics.set("planner_states", self.planner.state_count());
        metrics.set("effect_records", self.learner().effect_model().len());
        metrics.set("observations", self.learner().observations());
        metrics.set("reward_entries", self.planner.rewards().len());
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oomdp_core::{JsonConfig, ObjectId, Reward, SchemaBuilder};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    enum Lever {
        Pull,
        Wait,
    }

    impl Action for Lever {
        fn all() -> &'static [Self] {
            &[Lever::Pull, Lever::Wait]
        }

        fn name(self) -> &'static str {
            match self {
                Lever::Pull => "Pull",
                Lever::Wait => "Wait",
            }
        }
    }

    fn schema() -> Arc<Schema> {
        Arc::new(
            SchemaBuilder::new("lever")
                .class("lever")
                .boolean("down")
                .and()
                .relation("is_down", &["lever"], |a| a[0].flag("down"))
                .freeze()
                .unwrap(),
        )
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config = DoorMaxConfig::from_json_str(r#"{"reward_model": "condition"}"#).unwrap();
        assert_eq!(config.reward_model, RewardModelKind::Condition);
        assert_eq!(config.max_episode_steps, 1000);
        assert!(config.learner.prefer_no_change);
    }

    #[test]
    fn test_learn_feeds_both_models() {
        let schema = schema();
        let mut agent = DoorMaxAgent::<Lever>::new(&schema, DoorMaxConfig::default()).unwrap();
        let up = State::builder(&schema).object(0, "lever", &[("down", 0)]).build().unwrap();
        let down = up.with_value(ObjectId(0), "down", 1).unwrap();
        agent
            .observe(&Transition {
                state: up.clone(),
                action: Lever::Pull,
                reward: Reward(5.0),
                next_state: down.clone(),
                done: true,
                truncated: false,
            })
            .unwrap();
        assert_eq!(agent.learner().predict(&up, Lever::Pull).unwrap(), Some(down));
        let signature = Signature::of(&up);
        assert_eq!(
            agent.planner().rewards().lookup(&up, &signature, Lever::Pull),
            Some(RewardOutcome::new(5.0, true))
        );
        let metrics = agent.metrics();
        assert_eq!(metrics.total_steps, 1);
        assert_eq!(metrics.custom["reward_entries"], 1);
    }
}
