//! Traits defining the world model and search configuration for MCTS.
//!
//! `WorldModel` and `SearchConfig` are the two capabilities the engine
//! consumes. Both are async: a world model may drive an external system
//! (a browser, a simulator) and a search configuration may call out to a
//! scoring service. The engine itself never runs anything concurrently;
//! it simply awaits these calls in a fixed order.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::Result;

/// Opaque diagnostic/auxiliary payload attached to rewards and steps.
///
/// Fast-reward details, reward details and the auxiliary data returned by
/// [`WorldModel::step`] are all free-form key/value maps. The engine never
/// inspects them; it only forwards them to [`SearchConfig::reward`].
pub type Details = serde_json::Map<String, serde_json::Value>;

/// Merges two detail maps, with entries from `extra` overriding entries
/// from `base` on key collision.
pub fn merge_details(base: &Details, extra: &Details) -> Details {
    let mut merged = base.clone();
    merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// The environment the search explores.
///
/// A world model produces the initial state, advances states by actions,
/// and decides terminality. When the model fronts an external system, the
/// engine guarantees that `step` is awaited along every selected edge in
/// path order, so the external system tracks the trajectory the tree
/// policy chose.
///
/// Errors returned from any method abort the current search and propagate
/// to the caller unchanged.
#[async_trait]
pub trait WorldModel: Send + Sync {
    /// State of the environment at a tree node.
    type State: Clone + Debug + Send + Sync;

    /// Action labelling an edge between two nodes.
    type Action: Clone + Debug + Send + Sync;

    /// Returns the state the root node starts from.
    async fn init_state(&mut self) -> Result<Self::State>;

    /// Applies `action` in `state`, returning the successor state and an
    /// auxiliary payload that is forwarded to [`SearchConfig::reward`].
    async fn step(
        &mut self,
        state: &Self::State,
        action: &Self::Action,
    ) -> Result<(Self::State, Details)>;

    /// Returns true if `state` is terminal.
    async fn is_terminal(&mut self, state: &Self::State) -> Result<bool>;
}

/// Action enumeration and scoring for the search.
///
/// The order of actions returned by `get_actions` defines the child order
/// under the expanded node, which in turn drives the unvisited-first
/// selection rule.
#[async_trait]
pub trait SearchConfig<W: WorldModel>: Send + Sync {
    /// Enumerates the legal actions from `state`.
    async fn get_actions(&mut self, state: &W::State) -> Result<Vec<W::Action>>;

    /// Cheap prior estimate of the one-step reward for taking `action`
    /// from `state`, plus diagnostic details. Called at child creation,
    /// before the child's state exists, and treated as synchronous.
    fn fast_reward(&mut self, state: &W::State, action: &W::Action) -> (f64, Details);

    /// Realized one-step reward for taking `action` from `state`.
    ///
    /// `context` is the child's fast-reward details merged with the
    /// auxiliary payload from the [`WorldModel::step`] that resolved the
    /// child, letting the world model hand cached computation to the
    /// reward function. Auxiliary entries win on key collision.
    async fn reward(
        &mut self,
        state: &W::State,
        action: &W::Action,
        context: &Details,
    ) -> Result<(f64, Details)>;
}
