//! Main implementation of the Monte Carlo Tree Search engine.
//!
//! This module contains the search driver orchestrating the four phases
//! of selection, expansion, simulation and back-propagation, plus the
//! result type a finished search returns.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, trace};

use crate::aggregate::MCTSAggregation;
use crate::config::MCTSConfig;
use crate::policy::output::{self, OutputStrategy};
use crate::policy::selection::uct_select;
use crate::stats::SearchStatistics;
use crate::tree::{MCTSNode, NodeId, Tree};
use crate::world::{merge_details, Details, SearchConfig, WorldModel};
use crate::Result;

/// Maps a node to a diagnostic payload for tree rendering.
pub type NodeVisualizer<S, A> = Arc<dyn Fn(&MCTSNode<S, A>) -> Details + Send + Sync>;

/// Outcome of one search invocation.
///
/// The whole tree is part of the result, so every field that names nodes
/// does so by [`NodeId`] into [`MCTSResult::tree`].
#[derive(Debug, Clone)]
pub struct MCTSResult<S, A> {
    /// State at the tail of the output trajectory. Despite the name this
    /// can be a non-terminal state under `follow_max` and `last_iter`,
    /// which may end on a dead end. `None` when the output strategy
    /// required a terminal and none was found.
    pub terminal_state: Option<S>,

    /// Cumulative reward of the output trajectory; negative infinity
    /// when no trajectory qualified.
    pub cum_reward: f64,

    /// States along the output trajectory paired with the actions taken
    /// from the second node onward.
    pub trace: Option<(Vec<S>, Vec<A>)>,

    /// Node ids of the output trajectory, root first.
    pub trace_of_nodes: Option<Vec<NodeId>>,

    /// The full search tree.
    pub tree: Tree<S, A>,

    /// Chosen path of every iteration, when per-iteration recording was
    /// enabled.
    pub trace_in_each_iter: Option<Vec<Vec<NodeId>>>,

    /// Snapshot of the tree after every iteration, when per-iteration
    /// recording was enabled.
    pub tree_state_after_each_iter: Option<Vec<Tree<S, A>>>,

    /// Winning answer of the aggregation pass, when an aggregator was
    /// configured and any terminal produced an answer.
    pub aggregated_result: Option<String>,
}

/// The Monte Carlo Tree Search engine.
///
/// The engine owns its configuration and per-search statistics; the
/// world model and search configuration are handed to [`MCTS::search`]
/// per invocation. Every invocation builds a fresh tree, so node ids
/// restart at 0 each time.
pub struct MCTS<W: WorldModel> {
    config: MCTSConfig,
    aggregator: Option<MCTSAggregation<W::State>>,
    node_visualizer: Option<NodeVisualizer<W::State, W::Action>>,
    statistics: SearchStatistics,
    _world: PhantomData<fn() -> W>,
}

impl<W: WorldModel> MCTS<W> {
    /// Creates a new engine with the given configuration.
    pub fn new(config: MCTSConfig) -> Self {
        MCTS {
            config,
            aggregator: None,
            node_visualizer: None,
            statistics: SearchStatistics::new(),
            _world: PhantomData,
        }
    }

    /// Attaches an answer aggregator applied to the final tree.
    pub fn with_aggregator(mut self, aggregator: MCTSAggregation<W::State>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Attaches a node visualizer used by [`MCTS::render_tree`].
    pub fn with_node_visualizer<F>(mut self, visualizer: F) -> Self
    where
        F: Fn(&MCTSNode<W::State, W::Action>) -> Details + Send + Sync + 'static,
    {
        self.node_visualizer = Some(Arc::new(visualizer));
        self
    }

    /// Returns the statistics of the most recent search.
    pub fn statistics(&self) -> &SearchStatistics {
        &self.statistics
    }

    /// Runs the search: grows the tree for `n_iters` iterations, then
    /// materializes the output trajectory per the configured output
    /// strategy and, if an aggregator is attached, the aggregated
    /// answer.
    ///
    /// Errors from the world model or search configuration abort the
    /// search and propagate to the caller.
    pub async fn search<C: SearchConfig<W>>(
        &mut self,
        world_model: &mut W,
        search_config: &mut C,
    ) -> Result<MCTSResult<W::State, W::Action>> {
        let start = Instant::now();
        self.statistics = SearchStatistics::new();

        let root_state = world_model.init_state().await?;
        let mut run = SearchRun {
            config: &self.config,
            world_model,
            search_config,
            tree: Tree::new(root_state),
            output_iter: None,
            output_cum_reward: f64::NEG_INFINITY,
        };

        let mut trace_in_each_iter = self.config.output_trace_in_each_iter.then(Vec::new);
        let mut snapshots = self.config.output_trace_in_each_iter.then(Vec::new);

        for iteration in 0..self.config.n_iters {
            debug!("mcts iteration {iteration}");
            let path = run.iterate().await?;
            if let Some(snapshots) = snapshots.as_mut() {
                snapshots.push(run.tree.clone());
            }
            if let Some(traces) = trace_in_each_iter.as_mut() {
                traces.push(path);
            }
        }

        match self.config.output_strategy {
            OutputStrategy::MaxReward => {
                let root = run.tree.root();
                let (cum, path) = output::dfs_max_reward(&run.tree, vec![root], &self.config.cum_reward);
                if cum == f64::NEG_INFINITY {
                    run.output_iter = None;
                    run.output_cum_reward = f64::NEG_INFINITY;
                } else {
                    run.output_iter = Some(path);
                    run.output_cum_reward = cum;
                }
            }
            OutputStrategy::FollowMax => {
                let (cum, path) = output::follow_max(&run.tree, &self.config.cum_reward);
                run.output_iter = Some(path);
                run.output_cum_reward = cum;
            }
            OutputStrategy::MaxVisit => match output::max_visit(&run.tree, &self.config.cum_reward) {
                Some((cum, path)) => {
                    run.output_iter = Some(path);
                    run.output_cum_reward = cum;
                }
                None => {
                    run.output_iter = None;
                    run.output_cum_reward = f64::NEG_INFINITY;
                }
            },
            // recorded while iterating
            OutputStrategy::MaxIter | OutputStrategy::LastIter | OutputStrategy::LastTerminalIter => {}
        }

        let SearchRun {
            tree,
            output_iter,
            output_cum_reward,
            ..
        } = run;

        let (terminal_state, trace) = match &output_iter {
            None => (None, None),
            Some(path) => {
                let states: Option<Vec<W::State>> = path
                    .iter()
                    .map(|&id| tree.get(id).state.clone())
                    .collect();
                let actions: Option<Vec<W::Action>> = path
                    .iter()
                    .skip(1)
                    .map(|&id| tree.get(id).action.clone())
                    .collect();
                let terminal_state = path.last().and_then(|&id| tree.get(id).state.clone());
                let trace = match (states, actions) {
                    (Some(states), Some(actions)) => Some((states, actions)),
                    _ => None,
                };
                (terminal_state, trace)
            }
        };

        let aggregated_result = self.aggregator.as_ref().and_then(|agg| agg.aggregate(&tree));

        self.statistics.iterations = self.config.n_iters;
        self.statistics.tree_size = tree.len();
        self.statistics.max_depth = tree.max_depth();
        self.statistics.total_time = start.elapsed();
        info!("{}", self.statistics.summary());

        Ok(MCTSResult {
            terminal_state,
            cum_reward: output_cum_reward,
            trace,
            trace_of_nodes: output_iter,
            tree,
            trace_in_each_iter,
            tree_state_after_each_iter: snapshots,
            aggregated_result,
        })
    }

    /// Returns an indented text rendering of a result's tree, one node
    /// per line with visit count, Q, reward and markers for terminal and
    /// unresolved nodes. When a node visualizer is attached, its payload
    /// is appended to each line.
    pub fn render_tree(&self, result: &MCTSResult<W::State, W::Action>) -> String {
        let mut output = String::new();
        self.render_node(&result.tree, result.tree.root(), 0, &mut output);
        output
    }

    fn render_node(
        &self,
        tree: &Tree<W::State, W::Action>,
        id: NodeId,
        indent: usize,
        output: &mut String,
    ) {
        let node = tree.get(id);
        let prefix = "  ".repeat(indent);
        let label = match &node.action {
            Some(action) => format!("{action:?}"),
            None => "root".to_string(),
        };
        let marker = if node.is_terminal {
            " [terminal]"
        } else if node.is_unresolved() {
            " [unresolved]"
        } else {
            ""
        };
        output.push_str(&format!(
            "{prefix}{label} (N: {}, Q: {:.3}, reward: {:.3}, q_hist: {:.3}){marker}",
            node.n(),
            node.q(),
            node.reward,
            self.config.calc_q.reduce(&node.cum_rewards),
        ));
        if let Some(visualizer) = &self.node_visualizer {
            output.push_str(&format!(" {}", serde_json::Value::Object(visualizer(node))));
        }
        output.push('\n');
        for &child in tree.children(id) {
            self.render_node(tree, child, indent + 1, output);
        }
    }
}

/// State of one `search` invocation: the growing tree plus the streaming
/// output candidate for the iteration-recorded strategies.
struct SearchRun<'a, W: WorldModel, C: SearchConfig<W>> {
    config: &'a MCTSConfig,
    world_model: &'a mut W,
    search_config: &'a mut C,
    tree: Tree<W::State, W::Action>,
    output_iter: Option<Vec<NodeId>>,
    output_cum_reward: f64,
}

impl<'a, W: WorldModel, C: SearchConfig<W>> SearchRun<'a, W, C> {
    fn is_terminal_with_depth_limit(&self, id: NodeId) -> bool {
        let node = self.tree.get(id);
        node.is_terminal || node.depth >= self.config.depth_limit
    }

    /// One full MCTS iteration; returns the path it walked.
    async fn iterate(&mut self) -> Result<Vec<NodeId>> {
        let mut path = self.select().await?;
        let leaf = path[path.len() - 1];
        if !self.is_terminal_with_depth_limit(leaf) {
            self.expand(leaf).await?;
            self.simulate(&mut path).await?;
        }
        let cum_reward = self.back_propagate(&path);

        let tail = path[path.len() - 1];
        let tail_terminal = self.tree.get(tail).is_terminal;
        match self.config.output_strategy {
            OutputStrategy::MaxIter
                if tail_terminal && cum_reward > self.output_cum_reward =>
            {
                self.output_cum_reward = cum_reward;
                self.output_iter = Some(path.clone());
            }
            OutputStrategy::LastIter => {
                self.output_cum_reward = cum_reward;
                self.output_iter = Some(path.clone());
            }
            OutputStrategy::LastTerminalIter if tail_terminal => {
                self.output_cum_reward = cum_reward;
                self.output_iter = Some(path.clone());
            }
            _ => {}
        }
        Ok(path)
    }

    /// Tree-policy descent from the root.
    ///
    /// Stops at the first node with uninitialized or empty children, or
    /// at a terminal or depth-limited node. For every edge taken, the
    /// world model is stepped so any external environment tracks the
    /// selected trajectory; the returned state is discarded here and the
    /// authoritative state assignment happens in `expand`.
    async fn select(&mut self) -> Result<Vec<NodeId>> {
        let mut path = Vec::new();
        let mut node = self.tree.root();
        loop {
            path.push(node);
            if self.tree.children(node).is_empty() || self.is_terminal_with_depth_limit(node) {
                trace!("selected path of {} nodes, leaf {node}", path.len());
                return Ok(path);
            }
            let child = uct_select(
                &self.tree,
                node,
                self.config.w_exp,
                self.config.uct_with_fast_reward,
            );
            let parent_state = self.tree.get(node).state.clone();
            let action = self.tree.get(child).action.clone();
            if let (Some(state), Some(action)) = (parent_state, action) {
                self.world_model.step(&state, &action).await?;
            }
            node = child;
        }
    }

    /// Resolves an unresolved node and materializes its children.
    ///
    /// Resolution order as observed by the collaborators: `step`, then
    /// `reward` (so the step's auxiliary payload can feed the reward
    /// computation), then `is_terminal`. Terminal nodes get no children.
    async fn expand(&mut self, id: NodeId) -> Result<()> {
        if self.tree.get(id).is_unresolved() {
            let parent = self.tree.get(id).parent;
            let action = self.tree.get(id).action.clone();
            if let (Some(parent), Some(action)) = (parent, action) {
                if let Some(parent_state) = self.tree.get(parent).state.clone() {
                    let (state, aux) = self.world_model.step(&parent_state, &action).await?;
                    let context = merge_details(&self.tree.get(id).fast_reward_details, &aux);
                    let (reward, reward_details) = self
                        .search_config
                        .reward(&parent_state, &action, &context)
                        .await?;
                    let is_terminal = self.world_model.is_terminal(&state).await?;
                    let node = self.tree.get_mut(id);
                    node.state = Some(state);
                    node.reward = reward;
                    node.reward_details = reward_details;
                    node.is_terminal = is_terminal;
                }
            }
        }

        if self.tree.get(id).is_terminal {
            return Ok(());
        }

        let Some(state) = self.tree.get(id).state.clone() else {
            return Ok(());
        };
        let actions = self.search_config.get_actions(&state).await?;
        debug!("expand {id}: {} actions", actions.len());
        let mut children = Vec::with_capacity(actions.len());
        for action in actions {
            let (fast_reward, fast_reward_details) =
                self.search_config.fast_reward(&state, &action);
            children.push(
                self.tree
                    .add_child(id, action, fast_reward, fast_reward_details),
            );
        }
        self.tree.get_mut(id).children = Some(children);
        Ok(())
    }

    /// Rollout from the path's tail down to a terminal, depth-limited or
    /// dead-end node, choosing among children by fast reward and
    /// extending the path as it goes.
    async fn simulate(&mut self, path: &mut Vec<NodeId>) -> Result<()> {
        let mut node = match path.last() {
            Some(&id) => id,
            None => return Ok(()),
        };
        loop {
            if self.tree.get(node).is_unresolved() {
                self.expand(node).await?;
            }
            if self.is_terminal_with_depth_limit(node) || self.tree.children(node).is_empty() {
                return Ok(());
            }
            let children = self.tree.children(node).to_vec();
            let fast_rewards: Vec<f64> = children
                .iter()
                .map(|&c| self.tree.get(c).fast_reward)
                .collect();
            let choice = self.config.simulate_strategy.choose(&fast_rewards)?;
            trace!("rollout at {node}: child {choice} of {}", children.len());
            node = children[choice];
            path.push(node);
        }
    }

    /// Credits every node on the path, leaf to root, with the leaf's
    /// one-step reward through the incremental-mean update, and returns
    /// the root's updated Q.
    ///
    /// The leaf reward is deliberately used at every ancestor instead of
    /// a per-path reward sum; output strategies that need a trajectory
    /// sum recompute it with the `cum_reward` reducer.
    fn back_propagate(&mut self, path: &[NodeId]) -> f64 {
        let reward = self.tree.get(path[path.len() - 1]).reward;
        for &id in path.iter().rev() {
            self.tree.get_mut(id).record_visit(reward);
        }
        self.tree.get(path[0]).q()
    }
}
