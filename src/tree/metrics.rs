use std::cmp::{max, min};

/// Structural statistics of a tree, gathered by a full traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeMetrics {
    /// Router nodes in the tree.
    pub routers: usize,
    /// Value (leaf) nodes; equals the number of insertions.
    pub leaves: usize,
    /// Depth of the deepest value node, counting the root level as 1.
    pub max_depth: usize,
    /// Depth of the shallowest value node.
    pub min_depth: usize,
}

impl TreeMetrics {
    pub(crate) fn empty() -> Self {
        TreeMetrics {
            routers: 0,
            leaves: 0,
            max_depth: 0,
            min_depth: 0,
        }
    }

    pub(crate) fn record_router(&mut self) {
        self.routers += 1;
    }

    pub(crate) fn record_leaf(&mut self, depth: usize) {
        self.max_depth = max(self.max_depth, depth);
        self.min_depth = if self.leaves == 0 {
            depth
        } else {
            min(self.min_depth, depth)
        };
        self.leaves += 1;
    }
}
