//! Output strategies: turning the finished tree into a trajectory.
//!
//! Three strategies resolve against the final tree (`max_reward`,
//! `follow_max`, `max_visit`); the other three are recorded while the
//! iterations run and only read back here.

use std::str::FromStr;

use crate::config::RewardReducer;
use crate::tree::{NodeId, Tree};
use crate::{MCTSError, Result};

/// How the output trajectory is selected once iterations finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStrategy {
    /// Depth-first search over the resolved part of the final tree for
    /// the terminal-ending path with the highest cumulative reward.
    MaxReward,
    /// Greedy descent from the root, at each step taking the resolved
    /// child with the highest reward. May end on a non-terminal node.
    FollowMax,
    /// The path to the visited terminal node with the most visits; ties
    /// break toward the earliest-created node.
    MaxVisit,
    /// The iteration path with the highest back-propagated reward among
    /// those ending at a terminal.
    MaxIter,
    /// The last iteration's path, terminal or not.
    LastIter,
    /// The most recent iteration path that ended at a terminal.
    LastTerminalIter,
}

impl FromStr for OutputStrategy {
    type Err = MCTSError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max_reward" => Ok(OutputStrategy::MaxReward),
            "follow_max" => Ok(OutputStrategy::FollowMax),
            "max_visit" => Ok(OutputStrategy::MaxVisit),
            "max_iter" => Ok(OutputStrategy::MaxIter),
            "last_iter" => Ok(OutputStrategy::LastIter),
            "last_terminal_iter" => Ok(OutputStrategy::LastTerminalIter),
            other => Err(MCTSError::InvalidConfiguration(format!(
                "unknown output strategy `{other}`"
            ))),
        }
    }
}

/// Cumulative reward of a root-first path: the reducer applied to the
/// one-step rewards of every node after the root.
fn path_cum_reward<S, A>(tree: &Tree<S, A>, path: &[NodeId], cum_reward: &RewardReducer) -> f64 {
    let rewards: Vec<f64> = path
        .iter()
        .skip(1)
        .map(|&id| tree.get(id).reward)
        .collect();
    cum_reward.reduce(&rewards)
}

/// Depth-first search over resolved nodes for the best terminal path.
///
/// Returns negative infinity with the dead-end path when no resolved
/// terminal is reachable below `path`.
pub(crate) fn dfs_max_reward<S, A>(
    tree: &Tree<S, A>,
    path: Vec<NodeId>,
    cum_reward: &RewardReducer,
) -> (f64, Vec<NodeId>) {
    let cur = tree.get(path[path.len() - 1]);
    if cur.is_terminal {
        let reward = path_cum_reward(tree, &path, cum_reward);
        return (reward, path);
    }
    if cur.children.is_none() {
        return (f64::NEG_INFINITY, path);
    }
    let resolved: Vec<NodeId> = tree
        .children(cur.id)
        .iter()
        .copied()
        .filter(|&c| !tree.get(c).is_unresolved())
        .collect();
    if resolved.is_empty() {
        return (f64::NEG_INFINITY, path);
    }
    let mut best: Option<(f64, Vec<NodeId>)> = None;
    for child in resolved {
        let mut next = path.clone();
        next.push(child);
        let candidate = dfs_max_reward(tree, next, cum_reward);
        let better = match &best {
            None => true,
            Some((value, _)) => candidate.0 > *value,
        };
        if better {
            best = Some(candidate);
        }
    }
    match best {
        Some(found) => found,
        None => (f64::NEG_INFINITY, path),
    }
}

/// Greedy descent by realized reward over resolved children.
pub(crate) fn follow_max<S, A>(
    tree: &Tree<S, A>,
    cum_reward: &RewardReducer,
) -> (f64, Vec<NodeId>) {
    let mut path = vec![tree.root()];
    let mut cur = tree.root();
    loop {
        if tree.get(cur).is_terminal {
            break;
        }
        let resolved: Vec<NodeId> = tree
            .children(cur)
            .iter()
            .copied()
            .filter(|&c| !tree.get(c).is_unresolved())
            .collect();
        if resolved.is_empty() {
            break;
        }
        let mut best = resolved[0];
        for &child in &resolved[1..] {
            if tree.get(child).reward > tree.get(best).reward {
                best = child;
            }
        }
        cur = best;
        path.push(cur);
    }
    (path_cum_reward(tree, &path, cum_reward), path)
}

/// Path to the visited terminal with the most visits, or `None` when the
/// tree has no visited terminal. Ties break toward the smallest node id,
/// i.e. the earliest-created terminal.
pub(crate) fn max_visit<S, A>(
    tree: &Tree<S, A>,
    cum_reward: &RewardReducer,
) -> Option<(f64, Vec<NodeId>)> {
    let mut best: Option<NodeId> = None;
    for node in tree.iter() {
        if !node.is_terminal || node.n() == 0 {
            continue;
        }
        match best {
            None => best = Some(node.id),
            // creation-order iteration keeps the earliest node on ties
            Some(b) => {
                if node.n() > tree.get(b).n() {
                    best = Some(node.id);
                }
            }
        }
    }
    let winner = best?;
    let path = tree.path_from_root(winner);
    Some((path_cum_reward(tree, &path, cum_reward), path))
}
