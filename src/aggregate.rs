//! Answer aggregation over a finished search tree.
//!
//! An aggregator condenses the whole tree into a single answer by
//! crediting every answer found at a terminal node, then letting internal
//! nodes reinforce the answers that appear in their subtrees.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use log::warn;

use crate::tree::{NodeId, Tree};
use crate::{MCTSError, Result};

/// How much credit an answer collects from each node on its way up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightPolicy {
    /// Terminals credit their answer by `reward`; internal nodes add
    /// their own `reward` once per distinct answer in the subtree.
    Edge,
    /// Like `Edge`, but divided by depth at terminals and by the mean
    /// subtree depth of the answer at internal nodes.
    EdgeInverseDepth,
    /// Every answered terminal counts 1; internal nodes add nothing.
    Uniform,
}

impl FromStr for WeightPolicy {
    type Err = MCTSError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "edge" => Ok(WeightPolicy::Edge),
            "edge_inverse_depth" => Ok(WeightPolicy::EdgeInverseDepth),
            "uniform" => Ok(WeightPolicy::Uniform),
            other => Err(MCTSError::InvalidConfiguration(format!(
                "unknown weight policy `{other}`"
            ))),
        }
    }
}

/// Extracts the answer carried by a terminal state, if it has one.
pub type RetrieveAnswer<S> = Arc<dyn Fn(&S) -> Option<String> + Send + Sync>;

/// Collapses a finished tree into the answer with the most credit.
pub struct MCTSAggregation<S> {
    retrieve_answer: RetrieveAnswer<S>,
    weight_policy: WeightPolicy,
}

impl<S> MCTSAggregation<S> {
    /// Creates an aggregator from an answer extractor and weight policy.
    pub fn new<F>(retrieve_answer: F, weight_policy: WeightPolicy) -> Self
    where
        F: Fn(&S) -> Option<String> + Send + Sync + 'static,
    {
        MCTSAggregation {
            retrieve_answer: Arc::new(retrieve_answer),
            weight_policy,
        }
    }

    /// Walks the tree and returns the answer with the highest total
    /// credit, or `None` when no terminal yielded an answer. Credit ties
    /// break toward the lexicographically smallest answer.
    pub fn aggregate<A>(&self, tree: &Tree<S, A>) -> Option<String> {
        let mut credit: BTreeMap<String, f64> = BTreeMap::new();
        self.visit(tree, tree.root(), &mut credit);

        let mut winner: Option<(&String, f64)> = None;
        for (answer, &total) in &credit {
            let better = match winner {
                None => true,
                Some((_, best)) => total > best,
            };
            if better {
                winner = Some((answer, total));
            }
        }
        winner.map(|(answer, _)| answer.clone())
    }

    /// Recursive walk; returns the (answer, depth) pairs of the answered
    /// terminals in the subtree under `id`.
    fn visit<A>(
        &self,
        tree: &Tree<S, A>,
        id: NodeId,
        credit: &mut BTreeMap<String, f64>,
    ) -> Vec<(String, usize)> {
        let node = tree.get(id);
        let Some(state) = &node.state else {
            return Vec::new();
        };
        if node.is_terminal {
            let Some(answer) = (self.retrieve_answer)(state) else {
                warn!("aggregation: no answer retrieved at terminal node {id}");
                return Vec::new();
            };
            let weight = match self.weight_policy {
                WeightPolicy::Edge => node.reward,
                WeightPolicy::EdgeInverseDepth => node.reward / node.depth as f64,
                WeightPolicy::Uniform => 1.0,
            };
            *credit.entry(answer.clone()).or_insert(0.0) += weight;
            return vec![(answer, node.depth)];
        }

        let mut subtree: Vec<(String, usize)> = Vec::new();
        let mut depths: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for &child in tree.children(id) {
            let child_info = self.visit(tree, child, credit);
            for (answer, depth) in &child_info {
                depths.entry(answer.clone()).or_default().push(*depth);
            }
            subtree.extend(child_info);
        }
        for (answer, answer_depths) in depths {
            let weight = match self.weight_policy {
                WeightPolicy::Edge => node.reward,
                WeightPolicy::EdgeInverseDepth => {
                    let mean = answer_depths.iter().sum::<usize>() as f64
                        / answer_depths.len() as f64;
                    node.reward / mean
                }
                WeightPolicy::Uniform => continue,
            };
            *credit.entry(answer).or_insert(0.0) += weight;
        }
        subtree
    }
}

impl<S> Clone for MCTSAggregation<S> {
    fn clone(&self) -> Self {
        MCTSAggregation {
            retrieve_answer: Arc::clone(&self.retrieve_answer),
            weight_policy: self.weight_policy,
        }
    }
}

impl<S> std::fmt::Debug for MCTSAggregation<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MCTSAggregation")
            .field("weight_policy", &self.weight_policy)
            .finish()
    }
}
