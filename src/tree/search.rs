use crate::distance::DistanceValue;

use super::node::NodeId;
use super::queue::PriorityQueue;
use super::result_set::LimitedSet;
use super::tree::MTree;

impl<V, D> MTree<V, D>
where
    V: Clone + PartialEq,
    D: DistanceValue,
{
    /// The `k` stored values nearest to `query`, as a set: exactly
    /// `min(k, len)` values, no excluded value strictly closer than the
    /// worst included one, ties broken arbitrarily and order unspecified.
    ///
    /// Best-first branch-and-bound. The frontier orders routers by their
    /// lower bound `min_distance(query)`; the collector keeps the `k`
    /// smallest upper bounds `max_distance(query)` seen so far, and its
    /// cutoff tightens every pruning decision after it. Soundness rests
    /// on the covering invariant plus the triangle inequality:
    /// `min_distance(query) <= d(query, v) <= max_distance(query)` for
    /// every value `v` inside a node's subtree.
    pub fn knn(&self, query: &V, k: usize) -> Vec<V> {
        if k == 0 {
            return Vec::new();
        }
        let root = match self.root {
            Some(root) => root,
            None => return Vec::new(),
        };
        if k >= self.len() {
            return self.iter().cloned().collect();
        }

        let mut results: LimitedSet<D, NodeId> = LimitedSet::new(k);
        let mut frontier: PriorityQueue<D, NodeId> = PriorityQueue::new();
        frontier.push(self.min_distance(root, query), root);

        while let Some((_, node)) = frontier.pop() {
            // the expanded router no longer stands in for its subtree;
            // its children are offered individually below
            results.discard(&node);
            let query_d = self.distance_to_value(node, query);
            for &child in self.node(node).children() {
                let router_d = self.router_distance(node, child);
                // |d(parent, query) - d(parent, child)| - child.radius is a
                // distance-free lower bound via the triangle inequality;
                // computed underflow-safely for unsigned distance types
                let bound = query_d.abs_diff(router_d).sub_or_zero(self.node(child).radius);
                if bound > results.limit() {
                    continue;
                }
                let child_min = self.min_distance(child, query);
                if child_min > results.limit() {
                    continue;
                }
                if self.node(child).is_router() {
                    frontier.push(child_min, child);
                }
                // offer speculatively: routers tighten the cutoff early
                // and are discarded again when popped for expansion
                results.add(self.max_distance(child, query), child);
            }
        }

        results
            .into_items()
            .into_iter()
            .map(|id| self.node(id).router.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use crate::distance::{AbsoluteDifference, EditDistance};
    use crate::tree::MTree;

    fn brute_force_knn(values: &[u64], query: u64, k: usize) -> Vec<u64> {
        let mut sorted: Vec<u64> = values.to_vec();
        sorted.sort_by_key(|v| v.abs_diff(query));
        sorted.truncate(k);
        sorted
    }

    #[test]
    fn knn_on_empty_tree_is_empty() {
        let tree = MTree::<u64, u64>::new(Arc::new(AbsoluteDifference));
        assert!(tree.knn(&5, 3).is_empty());
    }

    #[test]
    fn zero_k_yields_nothing() {
        let tree = MTree::from_values([1u64, 2, 3], 2, Arc::new(AbsoluteDifference)).unwrap();
        assert!(tree.knn(&2, 0).is_empty());
    }

    #[test]
    fn k_at_least_len_returns_everything() {
        let tree = MTree::from_values([9u64, 4, 7], 2, Arc::new(AbsoluteDifference)).unwrap();
        for k in [3, 10] {
            let mut all = tree.knn(&0, k);
            all.sort_unstable();
            assert_eq!(all, vec![4, 7, 9]);
        }
    }

    #[test]
    fn singleton_tree() {
        let tree = MTree::from_values([42u64], 2, Arc::new(AbsoluteDifference)).unwrap();
        assert_eq!(tree.knn(&0, 1), vec![42]);
    }

    #[test]
    fn all_equal_values_terminate() {
        let tree =
            MTree::from_values(std::iter::repeat(7u64).take(30), 2, Arc::new(AbsoluteDifference))
                .unwrap();
        let result = tree.knn(&7, 5);
        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|&v| v == 7));
    }

    #[test]
    fn nearest_string() {
        let words = ["carrot", "cabbage", "potato", "tomato", "onion"];
        let tree = MTree::from_values(
            words.iter().map(|s| s.to_string()),
            2,
            Arc::new(EditDistance),
        )
        .unwrap();
        assert_eq!(tree.knn(&"tomatoes".to_string(), 1), vec!["tomato"]);
    }

    proptest! {
        #[test]
        fn knn_matches_brute_force(values in proptest::collection::hash_set(0u64..10_000, 1..50),
                                   query in 0u64..10_000,
                                   k in 1usize..10,
                                   cap in 2usize..8) {
            let values: Vec<u64> = values.into_iter().collect();
            let tree = MTree::from_values(values.iter().copied(), cap,
                                          Arc::new(AbsoluteDifference)).unwrap();
            let result = tree.knn(&query, k);
            let expected = brute_force_knn(&values, query, k);

            prop_assert_eq!(result.len(), expected.len());
            // exact set equality up to distance ties: the worst included
            // distance must match the true k-th nearest distance
            let worst = result.iter().map(|v| v.abs_diff(query)).max().unwrap();
            let expected_worst = expected.iter().map(|v| v.abs_diff(query)).max().unwrap();
            prop_assert_eq!(worst, expected_worst);
            for v in &result {
                prop_assert!(tree.contains(v));
            }
        }
    }
}
