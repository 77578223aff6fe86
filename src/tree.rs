//! Tree data structures for Monte Carlo Tree Search.
//!
//! The search tree is an arena: nodes live in a flat vector owned by
//! [`Tree`] and refer to each other by [`NodeId`] index. This keeps
//! parent back-references cycle-free without reference counting, and a
//! fresh arena per search means node ids start at 0 on every invocation.

use std::fmt;

use crate::world::Details;

/// Index of a node in a [`Tree`] arena.
///
/// Ids are assigned in creation order and are unique within a single
/// search invocation. The root is always `NodeId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the MCTS tree.
///
/// A node is created either as the root (state known up front) or as a
/// child placeholder during expansion, in which case `state` is `None`
/// until the node is first selected or rolled through. `reward` starts
/// out equal to `fast_reward` and is overwritten once the state is
/// resolved and the realized one-step reward has been computed.
#[derive(Debug, Clone)]
pub struct MCTSNode<S, A> {
    /// Arena id of this node.
    pub id: NodeId,

    /// World-model state at this node; `None` while unresolved.
    pub state: Option<S>,

    /// Action taken from the parent to reach this node (`None` on root).
    pub action: Option<A>,

    /// Parent node (`None` on root).
    pub parent: Option<NodeId>,

    /// Child nodes in action-enumeration order; `None` before the first
    /// expansion of this node.
    pub children: Option<Vec<NodeId>>,

    /// Distance from the root.
    pub depth: usize,

    /// Whether the resolved state is terminal.
    pub is_terminal: bool,

    /// Prior reward estimate supplied at creation.
    pub fast_reward: f64,

    /// Diagnostics attached to the prior estimate.
    pub fast_reward_details: Details,

    /// Realized one-step reward; equals `fast_reward` until resolved.
    pub reward: f64,

    /// Diagnostics attached to the realized reward.
    pub reward_details: Details,

    /// Leaf rewards observed during back-propagations through this node.
    /// Diagnostic history only; the running mean behind [`q`](Self::q) is
    /// authoritative.
    pub cum_rewards: Vec<f64>,

    n: u64,
    q: f64,
}

impl<S, A> MCTSNode<S, A> {
    fn new(
        id: NodeId,
        state: Option<S>,
        action: Option<A>,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Self {
        MCTSNode {
            id,
            state,
            action,
            parent,
            children: None,
            depth,
            is_terminal: false,
            fast_reward: 0.0,
            fast_reward_details: Details::new(),
            reward: 0.0,
            reward_details: Details::new(),
            cum_rewards: Vec::new(),
            n: 0,
            q: 0.0,
        }
    }

    /// Number of back-propagations through this node.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Action-value estimate: 0 while unvisited, otherwise the running
    /// mean of the leaf rewards back-propagated through this node.
    pub fn q(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.q
    }

    /// True if the node's state has not been computed yet.
    pub fn is_unresolved(&self) -> bool {
        self.state.is_none()
    }

    /// Folds one back-propagated leaf reward into the visit statistics.
    pub(crate) fn record_visit(&mut self, reward: f64) {
        self.q = (self.q * self.n as f64 + reward) / (self.n as f64 + 1.0);
        self.n += 1;
        self.cum_rewards.push(reward);
    }
}

/// Arena holding every node of one search invocation.
///
/// The tree is returned whole as part of the search result, so callers
/// can inspect any node after the fact.
#[derive(Debug, Clone)]
pub struct Tree<S, A> {
    nodes: Vec<MCTSNode<S, A>>,
}

impl<S, A> Tree<S, A> {
    /// Creates a tree containing only the root, with the given state.
    pub fn new(root_state: S) -> Self {
        Tree {
            nodes: vec![MCTSNode::new(NodeId(0), Some(root_state), None, None, 0)],
        }
    }

    /// Id of the root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the tree holds only the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Borrows the node with the given id.
    pub fn get(&self, id: NodeId) -> &MCTSNode<S, A> {
        &self.nodes[id.0]
    }

    /// Mutably borrows the node with the given id.
    pub fn get_mut(&mut self, id: NodeId) -> &mut MCTSNode<S, A> {
        &mut self.nodes[id.0]
    }

    /// Children of `id` in insertion order; empty while uninitialized.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes[id.0].children.as_deref().unwrap_or(&[])
    }

    /// Iterates over every node in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &MCTSNode<S, A>> {
        self.nodes.iter()
    }

    /// Deepest node depth present in the tree.
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Creates an unresolved child placeholder under `parent`.
    ///
    /// The child starts with no state, the given action and fast-reward
    /// prior, and `reward` initialized to the prior. The caller installs
    /// the full child list on the parent once all placeholders exist,
    /// preserving action order.
    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        action: A,
        fast_reward: f64,
        fast_reward_details: Details,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        let mut child = MCTSNode::new(id, None, Some(action), Some(parent), depth);
        child.fast_reward = fast_reward;
        child.reward = fast_reward;
        child.fast_reward_details = fast_reward_details;
        self.nodes.push(child);
        id
    }

    /// Walks parent links from `id` back to the root, returning the path
    /// in root-first order.
    pub fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut cur = id;
        while let Some(parent) = self.nodes[cur.0].parent {
            path.push(parent);
            cur = parent;
        }
        path.reverse();
        path
    }
}
