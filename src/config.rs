//! Configuration options for the MCTS engine.
//!
//! This module defines the parameters that control tree growth, rollout
//! behavior and output selection. Use the builder methods to create a
//! customized configuration.

use std::fmt;
use std::sync::Arc;

use crate::policy::output::OutputStrategy;
use crate::policy::simulation::SimulateStrategy;

/// Reducer from a list of per-step rewards to a single value.
///
/// Used for `cum_reward` (trajectory scoring in the output strategies)
/// and `calc_q` (diagnostic reduction of a node's per-visit reward
/// history). The `Custom` variant is the escape hatch for arbitrary
/// reducers.
#[derive(Clone)]
pub enum RewardReducer {
    /// Sum of the rewards; 0 on empty input.
    Sum,
    /// Arithmetic mean of the rewards; 0 on empty input.
    Mean,
    /// Arbitrary reducer.
    Custom(Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>),
}

impl RewardReducer {
    /// Reduces `rewards` to a single value.
    pub fn reduce(&self, rewards: &[f64]) -> f64 {
        match self {
            RewardReducer::Sum => rewards.iter().sum(),
            RewardReducer::Mean => {
                if rewards.is_empty() {
                    0.0
                } else {
                    rewards.iter().sum::<f64>() / rewards.len() as f64
                }
            }
            RewardReducer::Custom(f) => f(rewards),
        }
    }
}

impl fmt::Debug for RewardReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardReducer::Sum => write!(f, "Sum"),
            RewardReducer::Mean => write!(f, "Mean"),
            RewardReducer::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Configuration for the MCTS engine.
///
/// # Example
///
/// ```
/// use wayfarer_mcts::{MCTSConfig, OutputStrategy, SimulateStrategy};
///
/// let config = MCTSConfig::default()
///     .with_w_exp(1.414)
///     .with_depth_limit(8)
///     .with_n_iters(100)
///     .with_simulate_strategy(SimulateStrategy::Max)
///     .with_output_strategy(OutputStrategy::MaxReward);
/// ```
#[derive(Debug, Clone)]
pub struct MCTSConfig {
    /// Exploration weight in the UCT formula.
    ///
    /// Higher values favor exploration of less-visited children.
    pub w_exp: f64,

    /// Hard cap on path length; nodes at this depth are treated as
    /// leaves by selection and rollout.
    pub depth_limit: usize,

    /// Number of select→expand→simulate→back-propagate iterations per
    /// search.
    pub n_iters: usize,

    /// Reducer that turns a trajectory's per-step rewards into the
    /// cumulative reward reported by the output strategies.
    pub cum_reward: RewardReducer,

    /// Diagnostic reducer over a node's per-visit reward history. The
    /// incremental mean maintained on the node drives UCT; this reducer
    /// only serves external inspection of `cum_rewards`.
    pub calc_q: RewardReducer,

    /// How rollouts choose among children by fast reward.
    pub simulate_strategy: SimulateStrategy,

    /// How the output trajectory is selected after the last iteration.
    pub output_strategy: OutputStrategy,

    /// Selection rule toggle. When true (default), selection visits
    /// unvisited children first and otherwise maximizes UCT. When false,
    /// a node with any unresolved child instead descends into the
    /// unresolved child with the highest fast reward.
    pub uct_with_fast_reward: bool,

    /// Record the chosen path and a snapshot of the tree after every
    /// iteration.
    pub output_trace_in_each_iter: bool,
}

impl Default for MCTSConfig {
    fn default() -> Self {
        MCTSConfig {
            w_exp: 1.0,
            depth_limit: 5,
            n_iters: 10,
            cum_reward: RewardReducer::Sum,
            calc_q: RewardReducer::Mean,
            simulate_strategy: SimulateStrategy::Random,
            output_strategy: OutputStrategy::MaxReward,
            uct_with_fast_reward: true,
            output_trace_in_each_iter: false,
        }
    }
}

impl MCTSConfig {
    /// Sets the exploration weight.
    pub fn with_w_exp(mut self, w_exp: f64) -> Self {
        self.w_exp = w_exp;
        self
    }

    /// Sets the depth limit.
    pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    /// Sets the number of iterations per search.
    pub fn with_n_iters(mut self, n_iters: usize) -> Self {
        self.n_iters = n_iters;
        self
    }

    /// Sets the cumulative-reward reducer.
    pub fn with_cum_reward(mut self, cum_reward: RewardReducer) -> Self {
        self.cum_reward = cum_reward;
        self
    }

    /// Sets the diagnostic Q reducer.
    pub fn with_calc_q(mut self, calc_q: RewardReducer) -> Self {
        self.calc_q = calc_q;
        self
    }

    /// Sets the rollout choice strategy.
    pub fn with_simulate_strategy(mut self, strategy: SimulateStrategy) -> Self {
        self.simulate_strategy = strategy;
        self
    }

    /// Sets the output strategy.
    pub fn with_output_strategy(mut self, strategy: OutputStrategy) -> Self {
        self.output_strategy = strategy;
        self
    }

    /// Sets the selection rule toggle.
    pub fn with_uct_with_fast_reward(mut self, enabled: bool) -> Self {
        self.uct_with_fast_reward = enabled;
        self
    }

    /// Enables or disables per-iteration trace recording.
    pub fn with_output_trace_in_each_iter(mut self, enabled: bool) -> Self {
        self.output_trace_in_each_iter = enabled;
        self
    }
}
