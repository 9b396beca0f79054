//! Episodes, greedy attempts and probe-driven training sessions

use serde::Serialize;

use oomdp_core::{Agent, Environment, Result, State, Trajectory, Transition};

/// A fixed evaluation start
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Probe {
    /// Start state
    pub start: State,
    /// Steps allowed to solve it
    pub max_steps: usize,
}

impl Probe {
    /// Create a probe
    #[must_use]
    pub fn new(start: State, max_steps: usize) -> Self {
        Self { start, max_steps }
    }
}

/// A greedy roll-out without learning
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt<A> {
    /// Start state
    pub start: State,
    /// Actions taken
    pub actions: Vec<A>,
    /// Undiscounted return
    pub total_reward: f64,
    /// Whether the environment terminated the episode within the step limit
    pub success: bool,
}

impl<A> Attempt<A> {
    /// An attempt that has not taken a step yet
    #[must_use]
    pub fn new(start: State, max_steps: usize) -> Self {
        Self {
            start,
            actions: Vec::with_capacity(max_steps),
            total_reward: 0.0,
            success: false,
        }
    }
}

/// Agents that can be evaluated without exploring or learning
pub trait GreedyAgent: Agent {
    /// Best action for `state` under what the agent knows
    fn greedy(&mut self, state: &State) -> Result<Self::Action>;
}

/// Greedy roll-out from a probe's start, without learning
pub fn run_attempt<G, E>(agent: &mut G, env: &mut E, probe: &Probe) -> Result<Attempt<G::Action>>
where
    G: GreedyAgent,
    E: Environment<Action = G::Action>,
{
    let mut attempt = Attempt::new(probe.start.clone(), probe.max_steps);
    let mut state = env.reset_to(probe.start.clone())?;
    for _ in 0..probe.max_steps {
        let action = agent.greedy(&state)?;
        let step = env.step(action)?;
        attempt.actions.push(action);
        attempt.total_reward += step.reward.0;
        state = step.state;
        if step.done {
            attempt.success = !step.truncated;
            break;
        }
    }
    tracing::debug!(
        steps = attempt.actions.len(),
        total_reward = attempt.total_reward,
        success = attempt.success,
        "attempt finished"
    );
    Ok(attempt)
}

/// Run one episode of any agent: act, step, observe until done or `max_steps`
///
/// Starts from `start` when given, otherwise from a fresh reset.
pub fn run_episode<G, E>(
    agent: &mut G,
    env: &mut E,
    start: Option<State>,
    max_steps: usize,
) -> Result<Trajectory<G::Action>>
where
    G: Agent,
    E: Environment<Action = G::Action>,
{
    let mut state = match start {
        Some(state) => env.reset_to(state)?,
        None => env.reset()?,
    };
    let episode_id = u64::try_from(agent.metrics().total_episodes).unwrap_or(u64::MAX);
    let mut trajectory = Trajectory::new(episode_id);

    for _ in 0..max_steps {
        let action = agent.act(&state)?;
        let step = env.step(action)?;
        let transition = Transition {
            state,
            action,
            reward: step.reward,
            next_state: step.state.clone(),
            done: step.done,
            truncated: step.truncated,
        };
        agent.observe(&transition)?;
        state = step.state;
        trajectory.push(transition);
        if step.done {
            break;
        }
    }

    agent.end_episode(trajectory.total_reward);
    tracing::info!(
        episode = episode_id,
        steps = trajectory.len(),
        total_reward = trajectory.total_reward,
        terminated = trajectory.terminated(),
        "episode finished"
    );
    Ok(trajectory)
}

/// Alternate training episodes with probe attempts
///
/// Returns the number of training episodes after which every probe was
/// solved, or `None` if `max_trials` episodes were not enough.
pub fn run_training_session<G, E>(
    agent: &mut G,
    env: &mut E,
    probes: &[Probe],
    max_trials: usize,
    max_steps: usize,
) -> Result<Option<usize>>
where
    G: GreedyAgent,
    E: Environment<Action = G::Action>,
{
    let mut total_steps = 0;
    for trial in 1..=max_trials {
        let trajectory = run_episode(agent, env, None, max_steps)?;
        total_steps += trajectory.len();

        let mut solved = true;
        for probe in probes {
            if !run_attempt(agent, env, probe)?.success {
                solved = false;
                break;
            }
        }
        if solved {
            tracing::info!(trials = trial, total_steps, "all probes solved");
            return Ok(Some(trial));
        }
    }
    tracing::info!(max_trials, total_steps, "probes still unsolved");
    Ok(None)
}
