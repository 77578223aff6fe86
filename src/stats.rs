//! Statistics collection for MCTS searches.

use std::time::Duration;

/// Statistics collected during one search invocation.
#[derive(Debug, Clone)]
pub struct SearchStatistics {
    /// Number of iterations performed.
    pub iterations: usize,

    /// Total wall time spent searching.
    pub total_time: Duration,

    /// Total number of nodes in the tree.
    pub tree_size: usize,

    /// Deepest node created during the search.
    pub max_depth: usize,
}

impl SearchStatistics {
    /// Creates a new, empty statistics object.
    pub fn new() -> Self {
        SearchStatistics {
            iterations: 0,
            total_time: Duration::from_secs(0),
            tree_size: 1,
            max_depth: 0,
        }
    }

    /// Returns the number of iterations per second.
    pub fn iterations_per_second(&self) -> f64 {
        if self.total_time.as_secs_f64() <= 0.0 {
            return 0.0;
        }
        self.iterations as f64 / self.total_time.as_secs_f64()
    }

    /// Returns a summary of the statistics as a string.
    pub fn summary(&self) -> String {
        format!(
            "MCTS search: {} iterations in {:.3}s, {} nodes, max depth {}",
            self.iterations,
            self.total_time.as_secs_f64(),
            self.tree_size,
            self.max_depth
        )
    }
}

impl Default for SearchStatistics {
    fn default() -> Self {
        Self::new()
    }
}
