use async_trait::async_trait;
use wayfarer_mcts::{
    Details, MCTSConfig, MCTSError, NodeId, OutputStrategy, Result, RewardReducer, SearchConfig,
    WorldModel, MCTS,
};

// Simple line-walking world for testing: every step advances the
// position, and the world is terminal once `terminal_at` is reached.
#[derive(Clone, Debug, PartialEq)]
struct Pos(u32);

#[derive(Clone, Debug, PartialEq)]
struct Advance(u32);

struct ChainWorld {
    terminal_at: u32,
}

#[async_trait]
impl WorldModel for ChainWorld {
    type State = Pos;
    type Action = Advance;

    async fn init_state(&mut self) -> Result<Pos> {
        Ok(Pos(0))
    }

    async fn step(&mut self, state: &Pos, action: &Advance) -> Result<(Pos, Details)> {
        Ok((Pos(state.0 + action.0), Details::new()))
    }

    async fn is_terminal(&mut self, state: &Pos) -> Result<bool> {
        Ok(state.0 >= self.terminal_at)
    }
}

// Scores every step with the same reward.
struct FlatScorer {
    reward: f64,
}

#[async_trait]
impl SearchConfig<ChainWorld> for FlatScorer {
    async fn get_actions(&mut self, _state: &Pos) -> Result<Vec<Advance>> {
        Ok(vec![Advance(1)])
    }

    fn fast_reward(&mut self, _state: &Pos, _action: &Advance) -> (f64, Details) {
        (self.reward, Details::new())
    }

    async fn reward(
        &mut self,
        _state: &Pos,
        _action: &Advance,
        _context: &Details,
    ) -> Result<(f64, Details)> {
        Ok((self.reward, Details::new()))
    }
}

#[tokio::test]
async fn single_step_terminal_search() {
    let config = MCTSConfig::default()
        .with_n_iters(1)
        .with_output_strategy(OutputStrategy::MaxReward);
    let mut mcts = MCTS::<ChainWorld>::new(config);
    let mut world = ChainWorld { terminal_at: 1 };
    let mut scorer = FlatScorer { reward: 1.0 };

    let result = mcts.search(&mut world, &mut scorer).await.unwrap();

    assert_eq!(result.cum_reward, 1.0);
    assert_eq!(result.terminal_state, Some(Pos(1)));
    let (states, actions) = result.trace.expect("terminal trajectory");
    assert_eq!(states, vec![Pos(0), Pos(1)]);
    assert_eq!(actions, vec![Advance(1)]);
}

#[tokio::test]
async fn depth_limit_caps_trajectories() {
    let config = MCTSConfig::default()
        .with_depth_limit(3)
        .with_n_iters(5)
        .with_cum_reward(RewardReducer::Sum)
        .with_output_strategy(OutputStrategy::LastIter);
    let mut mcts = MCTS::<ChainWorld>::new(config);
    // the chain never terminates on its own
    let mut world = ChainWorld {
        terminal_at: u32::MAX,
    };
    let mut scorer = FlatScorer { reward: 0.1 };

    let result = mcts.search(&mut world, &mut scorer).await.unwrap();

    let path = result.trace_of_nodes.expect("last iteration path");
    assert!(path.len() <= 4, "path should respect the depth limit");
    assert!(result.cum_reward <= 0.3 + 1e-9);
    for node in result.tree.iter().filter(|n| !n.is_unresolved()) {
        assert!(node.depth <= 3, "resolved node beyond the depth limit");
    }
}

#[tokio::test]
async fn tree_invariants_hold_after_search() {
    let n_iters = 8;
    let config = MCTSConfig::default()
        .with_depth_limit(4)
        .with_n_iters(n_iters);
    let mut mcts = MCTS::<ChainWorld>::new(config);
    let mut world = ChainWorld { terminal_at: 3 };
    let mut scorer = FlatScorer { reward: 0.5 };

    let result = mcts.search(&mut world, &mut scorer).await.unwrap();
    let tree = &result.tree;

    for (index, node) in tree.iter().enumerate() {
        assert_eq!(node.id, NodeId(index), "ids are assigned in creation order");
        assert_eq!(tree.path_from_root(node.id).len(), node.depth + 1);
        for &child in tree.children(node.id) {
            assert_eq!(tree.get(child).parent, Some(node.id));
            assert_eq!(tree.get(child).depth, node.depth + 1);
        }
        if node.n() == 0 {
            assert_eq!(node.q(), 0.0, "unvisited nodes read Q = 0");
        } else {
            let mean = RewardReducer::Mean.reduce(&node.cum_rewards);
            assert!((node.q() - mean).abs() < 1e-9, "Q is the running mean");
            assert_eq!(node.cum_rewards.len() as u64, node.n());
        }
        if node.is_terminal {
            assert!(tree.children(node.id).is_empty());
        }
    }

    // the root sees every back-propagation
    assert_eq!(tree.get(tree.root()).n(), n_iters as u64);
}

#[tokio::test]
async fn statistics_reflect_search() {
    let config = MCTSConfig::default().with_depth_limit(3).with_n_iters(6);
    let mut mcts = MCTS::<ChainWorld>::new(config);
    let mut world = ChainWorld { terminal_at: 2 };
    let mut scorer = FlatScorer { reward: 0.2 };

    let result = mcts.search(&mut world, &mut scorer).await.unwrap();

    let stats = mcts.statistics();
    assert_eq!(stats.iterations, 6);
    assert_eq!(stats.tree_size, result.tree.len());
    assert!(stats.tree_size > 1, "tree should have grown");
    assert_eq!(stats.max_depth, result.tree.max_depth());
    assert!(stats.summary().contains("6 iterations"));
}

#[tokio::test]
async fn per_iteration_traces_are_recorded() {
    let config = MCTSConfig::default()
        .with_n_iters(3)
        .with_output_trace_in_each_iter(true);
    let mut mcts = MCTS::<ChainWorld>::new(config);
    let mut world = ChainWorld { terminal_at: 2 };
    let mut scorer = FlatScorer { reward: 0.2 };

    let result = mcts.search(&mut world, &mut scorer).await.unwrap();

    let traces = result.trace_in_each_iter.expect("per-iteration paths");
    assert_eq!(traces.len(), 3);
    let snapshots = result
        .tree_state_after_each_iter
        .expect("per-iteration snapshots");
    assert_eq!(snapshots.len(), 3);
    for window in snapshots.windows(2) {
        assert!(window[0].len() <= window[1].len(), "trees only grow");
    }
    assert_eq!(snapshots[2].len(), result.tree.len());
}

// World whose transitions always fail, for error propagation.
struct FailingWorld;

#[async_trait]
impl WorldModel for FailingWorld {
    type State = Pos;
    type Action = Advance;

    async fn init_state(&mut self) -> Result<Pos> {
        Ok(Pos(0))
    }

    async fn step(&mut self, _state: &Pos, _action: &Advance) -> Result<(Pos, Details)> {
        Err(MCTSError::environment("browser crashed"))
    }

    async fn is_terminal(&mut self, _state: &Pos) -> Result<bool> {
        Ok(false)
    }
}

#[async_trait]
impl SearchConfig<FailingWorld> for FlatScorer {
    async fn get_actions(&mut self, _state: &Pos) -> Result<Vec<Advance>> {
        Ok(vec![Advance(1)])
    }

    fn fast_reward(&mut self, _state: &Pos, _action: &Advance) -> (f64, Details) {
        (self.reward, Details::new())
    }

    async fn reward(
        &mut self,
        _state: &Pos,
        _action: &Advance,
        _context: &Details,
    ) -> Result<(f64, Details)> {
        Ok((self.reward, Details::new()))
    }
}

#[tokio::test]
async fn environment_errors_abort_the_search() {
    let mut mcts = MCTS::<FailingWorld>::new(MCTSConfig::default());
    let mut world = FailingWorld;
    let mut scorer = FlatScorer { reward: 0.0 };

    let err = mcts.search(&mut world, &mut scorer).await.unwrap_err();

    assert!(matches!(err, MCTSError::Environment(_)));
    assert!(err.to_string().contains("browser crashed"));
}
