//! # wayfarer-mcts
//!
//! A Monte Carlo Tree Search engine for agents that explore action
//! trajectories through a pluggable world model.
//!
//! The engine grows a search tree from a root state, balancing
//! exploration and exploitation with UCB1, rolls out to a leaf guided by
//! cheap reward priors, and back-propagates value statistics. After a
//! fixed number of iterations it selects an output trajectory according
//! to a configurable output strategy and can optionally condense the
//! whole tree into a single answer.
//!
//! ## Features
//!
//! - Generic over any world model and scoring configuration
//! - Async collaborator boundary: world models may drive an external
//!   environment (a browser, a simulator) and are awaited in selected
//!   trajectory order
//! - Six output strategies, from best-terminal-path search to greedy
//!   descent over realized rewards
//! - Configurable rollout choice (max, categorical sample, uniform, or
//!   a custom reducer) and reward reduction
//! - Answer aggregation over the final tree with pluggable weighting
//!
//! ## Basic usage
//!
//! ```
//! use async_trait::async_trait;
//! use wayfarer_mcts::{
//!     Details, MCTSConfig, OutputStrategy, Result, SearchConfig, WorldModel, MCTS,
//! };
//!
//! // A one-dimensional corridor: walk right until the goal cell.
//! #[derive(Clone, Debug)]
//! struct Cell(u32);
//!
//! #[derive(Clone, Debug)]
//! struct Move(u32);
//!
//! struct Corridor {
//!     goal: u32,
//! }
//!
//! #[async_trait]
//! impl WorldModel for Corridor {
//!     type State = Cell;
//!     type Action = Move;
//!
//!     async fn init_state(&mut self) -> Result<Cell> {
//!         Ok(Cell(0))
//!     }
//!
//!     async fn step(&mut self, state: &Cell, action: &Move) -> Result<(Cell, Details)> {
//!         Ok((Cell(state.0 + action.0), Details::new()))
//!     }
//!
//!     async fn is_terminal(&mut self, state: &Cell) -> Result<bool> {
//!         Ok(state.0 >= self.goal)
//!     }
//! }
//!
//! struct CorridorScorer;
//!
//! #[async_trait]
//! impl SearchConfig<Corridor> for CorridorScorer {
//!     async fn get_actions(&mut self, _state: &Cell) -> Result<Vec<Move>> {
//!         Ok(vec![Move(1), Move(2)])
//!     }
//!
//!     fn fast_reward(&mut self, _state: &Cell, action: &Move) -> (f64, Details) {
//!         (action.0 as f64, Details::new())
//!     }
//!
//!     async fn reward(
//!         &mut self,
//!         _state: &Cell,
//!         action: &Move,
//!         _context: &Details,
//!     ) -> Result<(f64, Details)> {
//!         Ok((action.0 as f64, Details::new()))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let config = MCTSConfig::default()
//!     .with_n_iters(20)
//!     .with_output_strategy(OutputStrategy::MaxReward);
//! let mut mcts = MCTS::<Corridor>::new(config);
//!
//! let mut world = Corridor { goal: 4 };
//! let mut scorer = CorridorScorer;
//! let result = mcts.search(&mut world, &mut scorer).await?;
//!
//! assert!(result.terminal_state.is_some());
//! println!("{}", mcts.statistics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## How it works
//!
//! Each iteration runs four phases:
//!
//! 1. **Selection**: descend from the root, visiting unvisited children
//!    first and otherwise maximizing UCB1. The world model is stepped
//!    along every chosen edge so an external environment follows the
//!    selected trajectory.
//! 2. **Expansion**: resolve the leaf's state, realized reward and
//!    terminality, then create one child placeholder per legal action,
//!    each carrying a fast-reward prior.
//! 3. **Simulation**: roll out from the expanded frontier by choosing
//!    among children on their fast rewards, until a terminal,
//!    depth-limited or dead-end node.
//! 4. **Back-propagation**: fold the leaf's reward into the visit
//!    statistics of every node on the path.
//!
//! The output strategies and the answer aggregator are documented in
//! [`policy::output`] and [`aggregate`].

pub mod aggregate;
pub mod config;
pub mod mcts;
pub mod policy;
pub mod stats;
pub mod tree;
pub mod world;

pub use aggregate::{MCTSAggregation, WeightPolicy};
pub use config::{MCTSConfig, RewardReducer};
pub use mcts::{MCTSResult, NodeVisualizer, MCTS};
pub use policy::{OutputStrategy, SimulateStrategy};
pub use stats::SearchStatistics;
pub use tree::{MCTSNode, NodeId, Tree};
pub use world::{merge_details, Details, SearchConfig, WorldModel};

/// Error types for the MCTS engine
#[derive(thiserror::Error, Debug)]
pub enum MCTSError {
    /// A strategy or policy name failed to parse
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A world model or search configuration call failed; the search is
    /// aborted and the source error is carried unchanged
    #[error("environment failure: {0}")]
    Environment(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A rollout chooser produced an index with no matching child
    #[error("simulate strategy chose index {index} among {num_children} children")]
    InvalidSimulateChoice {
        /// The chosen index.
        index: usize,
        /// Number of children that were available.
        num_children: usize,
    },

    /// The `sample` rollout strategy was fed weights it cannot draw from
    #[error("fast-reward sampling failed: {0}")]
    Sampling(String),
}

impl MCTSError {
    /// Wraps a collaborator error for propagation through the engine.
    pub fn environment<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        MCTSError::Environment(err.into())
    }
}

/// Result type for MCTS operations
pub type Result<T> = std::result::Result<T, MCTSError>;
