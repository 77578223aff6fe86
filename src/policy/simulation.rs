//! Rollout choice strategies.
//!
//! A rollout descends from the expanded frontier by repeatedly choosing
//! among a node's children based on their fast-reward priors. The
//! strategy decides how that choice is made.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::{MCTSError, Result};

/// How a rollout chooses the next child from a list of fast rewards.
#[derive(Clone)]
pub enum SimulateStrategy {
    /// Always the child with the highest fast reward (first on ties).
    Max,
    /// Categorical sample with probabilities proportional to the fast
    /// rewards. The caller is responsible for supplying non-negative
    /// weights that are not all zero.
    Sample,
    /// Uniform choice over the children.
    Random,
    /// Arbitrary reducer from the fast-reward list to a child index.
    Custom(Arc<dyn Fn(&[f64]) -> usize + Send + Sync>),
}

impl SimulateStrategy {
    /// Chooses a child index given the children's fast rewards.
    ///
    /// `fast_rewards` must be non-empty. A `Custom` chooser returning an
    /// index out of range is reported as an error rather than truncated.
    pub fn choose(&self, fast_rewards: &[f64]) -> Result<usize> {
        if fast_rewards.is_empty() {
            return Err(MCTSError::InvalidSimulateChoice {
                index: 0,
                num_children: 0,
            });
        }
        let index = match self {
            SimulateStrategy::Max => {
                let mut best = 0;
                for (i, &reward) in fast_rewards.iter().enumerate().skip(1) {
                    if reward > fast_rewards[best] {
                        best = i;
                    }
                }
                best
            }
            SimulateStrategy::Sample => {
                let dist = WeightedIndex::new(fast_rewards)
                    .map_err(|e| MCTSError::Sampling(e.to_string()))?;
                dist.sample(&mut rand::thread_rng())
            }
            SimulateStrategy::Random => rand::thread_rng().gen_range(0..fast_rewards.len()),
            SimulateStrategy::Custom(f) => f(fast_rewards),
        };
        if index >= fast_rewards.len() {
            return Err(MCTSError::InvalidSimulateChoice {
                index,
                num_children: fast_rewards.len(),
            });
        }
        Ok(index)
    }
}

impl fmt::Debug for SimulateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulateStrategy::Max => write!(f, "Max"),
            SimulateStrategy::Sample => write!(f, "Sample"),
            SimulateStrategy::Random => write!(f, "Random"),
            SimulateStrategy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl FromStr for SimulateStrategy {
    type Err = MCTSError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max" => Ok(SimulateStrategy::Max),
            "sample" => Ok(SimulateStrategy::Sample),
            "random" => Ok(SimulateStrategy::Random),
            other => Err(MCTSError::InvalidConfiguration(format!(
                "unknown simulate strategy `{other}`"
            ))),
        }
    }
}
