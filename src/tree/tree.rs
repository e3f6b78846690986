use std::sync::Arc;

use anyerror::AnyError;

use crate::distance::{DistanceMetric, DistanceValue};

use super::metrics::TreeMetrics;
use super::node::{Node, NodeId, NodeKind};
use super::promoter::PromotionPolicy;

pub const DEFAULT_NODE_CAPACITY: usize = 8;

/// An M-tree: a dynamic metric index over opaque values.
///
/// The tree needs nothing from its values beyond the distance function;
/// there are no coordinates and no vector space. Routers cover their
/// subtree with a ball of known radius, which is what lets search prune
/// whole subtrees through the triangle inequality.
///
/// Nodes live in an arena indexed by [`NodeId`]; parent links are plain
/// indices used only for upward traversal during split propagation.
/// Duplicate values are legal and stored independently (multiset
/// semantics). Deletion is not supported.
///
/// All operations are synchronous and single-threaded; callers sharing a
/// tree across threads must serialize `insert` against everything else.
#[derive(Debug)]
pub struct MTree<V, D> {
    pub(super) nodes: Vec<Node<V, D>>,
    pub(super) root: Option<NodeId>,
    pub(super) length: usize,
    pub(super) node_capacity: usize,
    pub(super) promotion: PromotionPolicy,
    pub(super) metric: Arc<dyn DistanceMetric<V, D>>,
}

impl<V, D> MTree<V, D>
where
    V: Clone + PartialEq,
    D: DistanceValue,
{
    /// Build an empty tree with [`DEFAULT_NODE_CAPACITY`].
    pub fn new(metric: Arc<dyn DistanceMetric<V, D>>) -> Self {
        Self::with_parts(DEFAULT_NODE_CAPACITY, metric)
    }

    /// Build an empty tree with an explicit node capacity. A router must
    /// be able to hold two children to ever split, so `node_capacity < 2`
    /// is rejected.
    pub fn with_node_capacity(
        node_capacity: usize,
        metric: Arc<dyn DistanceMetric<V, D>>,
    ) -> Result<Self, AnyError> {
        if node_capacity < 2 {
            return Err(AnyError::error(format!(
                "node capacity must be at least 2, got {}",
                node_capacity
            )));
        }
        Ok(Self::with_parts(node_capacity, metric))
    }

    /// Build a tree from an initial batch of values.
    pub fn from_values(
        values: impl IntoIterator<Item = V>,
        node_capacity: usize,
        metric: Arc<dyn DistanceMetric<V, D>>,
    ) -> Result<Self, AnyError> {
        let mut tree = Self::with_node_capacity(node_capacity, metric)?;
        for value in values {
            tree.insert(value);
        }
        Ok(tree)
    }

    fn with_parts(node_capacity: usize, metric: Arc<dyn DistanceMetric<V, D>>) -> Self {
        MTree {
            nodes: Vec::new(),
            root: None,
            length: 0,
            node_capacity,
            promotion: PromotionPolicy::default(),
            metric,
        }
    }

    pub fn set_promotion_policy(&mut self, policy: PromotionPolicy) {
        self.promotion = policy;
    }

    /// Number of insertions, counting duplicates separately.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn node_capacity(&self) -> usize {
        self.node_capacity
    }

    /// Insert a value. Never fails; duplicates are stored again and
    /// counted again.
    pub fn insert(&mut self, value: V) {
        self.length += 1;
        match self.root {
            None => {
                let leaf = self.new_value_node(value);
                let root = self.new_router(vec![leaf]);
                self.root = Some(root);
            }
            Some(root) => {
                self.insert_at(root, value);
                // a root split surfaces as a freshly created parent
                let mut top = root;
                while let Some(parent) = self.node(top).parent {
                    top = parent;
                }
                self.root = Some(top);
            }
        }
    }

    /// Exact membership test, pruning subtrees whose covering ball cannot
    /// contain the value.
    pub fn contains(&self, value: &V) -> bool {
        match self.root {
            Some(root) => self.contains_in(root, value),
            None => false,
        }
    }

    /// Lazy traversal over all stored values, in unspecified order. Each
    /// call starts a fresh traversal.
    pub fn iter(&self) -> Iter<'_, V, D> {
        Iter {
            tree: self,
            stack: self.root.into_iter().collect(),
        }
    }

    /// Structural statistics, gathered by a full traversal.
    pub fn metrics(&self) -> TreeMetrics {
        let mut metrics = TreeMetrics::empty();
        let mut stack: Vec<(NodeId, usize)> = match self.root {
            Some(root) => vec![(root, 1)],
            None => Vec::new(),
        };
        while let Some((id, depth)) = stack.pop() {
            match &self.nodes[id.0].kind {
                NodeKind::Value => metrics.record_leaf(depth),
                NodeKind::Router { children } => {
                    metrics.record_router();
                    for &child in children {
                        stack.push((child, depth + 1));
                    }
                }
            }
        }
        metrics
    }

    // ---- node-level distance bounds -------------------------------------

    pub(super) fn node(&self, id: NodeId) -> &Node<V, D> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<V, D> {
        &mut self.nodes[id.0]
    }

    /// Exact distance from a node's router to a value.
    pub(super) fn distance_to_value(&self, id: NodeId, value: &V) -> D {
        self.metric.distance(&self.nodes[id.0].router, value)
    }

    /// Exact distance between two routers, without radii.
    pub(super) fn router_distance(&self, a: NodeId, b: NodeId) -> D {
        self.metric
            .distance(&self.nodes[a.0].router, &self.nodes[b.0].router)
    }

    /// Distance from `a`'s router to node `b`, charging `b`'s own radius
    /// so the result bounds every value inside `b`.
    fn distance_to_node(&self, a: NodeId, b: NodeId) -> D {
        self.router_distance(a, b) + self.nodes[b.0].radius
    }

    /// Lower bound on the distance from `value` to any value in the
    /// subtree: `max(0, d(router, value) - radius)`.
    pub(super) fn min_distance(&self, id: NodeId, value: &V) -> D {
        self.distance_to_value(id, value)
            .sub_or_zero(self.nodes[id.0].radius)
    }

    /// Upper bound on the same: `d(router, value) + radius`.
    pub(super) fn max_distance(&self, id: NodeId, value: &V) -> D {
        self.distance_to_value(id, value) + self.nodes[id.0].radius
    }

    // ---- insertion ------------------------------------------------------

    fn new_value_node(&mut self, value: V) -> NodeId {
        self.alloc(Node {
            router: value,
            radius: D::ZERO,
            parent: None,
            kind: NodeKind::Value,
        })
    }

    /// Create a router over `children`: its router is the first child's
    /// router and its radius covers every child ball.
    fn new_router(&mut self, children: Vec<NodeId>) -> NodeId {
        let router = self.node(children[0]).router.clone();
        let id = self.alloc(Node {
            router,
            radius: D::ZERO,
            parent: None,
            kind: NodeKind::Router {
                children: Vec::new(),
            },
        });
        self.set_children(id, children);
        id
    }

    fn alloc(&mut self, node: Node<V, D>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// True when this router's children are value nodes.
    fn leaf_level(&self, id: NodeId) -> bool {
        let first = self.node(id).children()[0];
        !self.node(first).is_router()
    }

    fn insert_at(&mut self, node: NodeId, value: V) {
        if self.leaf_level(node) {
            let leaf = self.new_value_node(value);
            self.add_child(node, leaf);
        } else {
            // grow the radius on the way down so the covering invariant
            // already holds before any split resolves
            let d = self.distance_to_value(node, &value);
            let n = self.node_mut(node);
            n.radius = n.radius.max(d);
            let target = self.select_child(node, &value);
            self.insert_at(target, value);
        }
    }

    /// Pick the subtree to descend into: the nearest child if it already
    /// covers the value, otherwise the child needing the least radius
    /// increase, which is grown to cover. First minimizer wins ties.
    fn select_child(&mut self, node: NodeId, value: &V) -> NodeId {
        let dists: Vec<(NodeId, D)> = self
            .node(node)
            .children()
            .iter()
            .map(|&child| (child, self.distance_to_value(child, value)))
            .collect();

        let (mut nearest, mut nearest_d) = dists[0];
        for &(child, d) in &dists[1..] {
            if d < nearest_d {
                nearest = child;
                nearest_d = d;
            }
        }
        if nearest_d <= self.node(nearest).radius {
            return nearest;
        }

        // least radius increase: d - r, compared as d_a + r_b < d_b + r_a
        // since D may be unsigned
        let (mut best, mut best_d) = dists[0];
        for &(child, d) in &dists[1..] {
            if d + self.node(best).radius < best_d + self.node(child).radius {
                best = child;
                best_d = d;
            }
        }
        let grown = self.node_mut(best);
        grown.radius = grown.radius.max(best_d);
        best
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).children().len() >= self.node_capacity {
            self.split(parent, child);
        } else {
            self.attach_child(parent, child);
        }
    }

    fn attach_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(parent)
                .children()
                .iter()
                .all(|&c| self.node(c).is_router() == self.node(child).is_router()),
            "router children must stay homogeneous"
        );
        let d = self.distance_to_node(parent, child);
        self.node_mut(child).parent = Some(parent);
        let p = self.node_mut(parent);
        p.radius = p.radius.max(d);
        p.children_mut().push(child);
    }

    /// Overflow handling: promote two routers out of the capacity+1
    /// candidates, partition the rest between them, reuse this node for
    /// the first half and hand a new sibling to the parent. With no
    /// parent, a fresh root adopts both and the tree grows a level.
    fn split(&mut self, node: NodeId, extra: NodeId) {
        let mut candidates = std::mem::take(self.node_mut(node).children_mut());
        candidates.push(extra);
        let (a_list, b_list) = self.promote_and_partition(candidates);
        self.set_children(node, a_list);
        let sibling = self.new_router(b_list);
        match self.node(node).parent {
            None => {
                self.new_router(vec![node, sibling]);
            }
            Some(parent) => self.add_child(parent, sibling),
        }
    }

    fn promote_and_partition(&self, candidates: Vec<NodeId>) -> (Vec<NodeId>, Vec<NodeId>) {
        let (ai, bi) = match self.promotion {
            PromotionPolicy::FirstTwo => (0, 1),
            PromotionPolicy::MaxSpread => {
                let mut pair = (0, 1);
                let mut spread = self.router_distance(candidates[0], candidates[1]);
                for i in 0..candidates.len() {
                    for j in (i + 1)..candidates.len() {
                        let d = self.router_distance(candidates[i], candidates[j]);
                        if d > spread {
                            pair = (i, j);
                            spread = d;
                        }
                    }
                }
                pair
            }
        };

        let a = candidates[ai];
        let b = candidates[bi];
        let mut a_list = vec![a];
        let mut b_list = vec![b];
        for (i, &item) in candidates.iter().enumerate() {
            if i == ai || i == bi {
                continue;
            }
            if self.distance_to_node(a, item) < self.distance_to_node(b, item) {
                a_list.push(item);
            } else {
                b_list.push(item);
            }
        }
        (a_list, b_list)
    }

    /// Reset a router to exactly `children`: the first child's router
    /// becomes the representative and the radius is recomputed honestly
    /// from the actual members.
    fn set_children(&mut self, node: NodeId, children: Vec<NodeId>) {
        let router = self.node(children[0]).router.clone();
        let mut radius = D::ZERO;
        for &child in &children {
            let d = self.metric.distance(&router, &self.nodes[child.0].router)
                + self.nodes[child.0].radius;
            radius = radius.max(d);
        }
        for &child in &children {
            self.node_mut(child).parent = Some(node);
        }
        let n = self.node_mut(node);
        n.router = router;
        n.radius = radius;
        n.kind = NodeKind::Router { children };
    }

    // ---- membership -----------------------------------------------------

    fn contains_in(&self, node: NodeId, value: &V) -> bool {
        let n = self.node(node);
        if !n.is_router() {
            return n.router == *value;
        }
        if self.distance_to_value(node, value) > n.radius {
            return false;
        }
        n.children()
            .iter()
            .any(|&child| self.contains_in(child, value))
    }
}

/// Depth-first traversal over stored values. See [`MTree::iter`].
#[derive(Debug)]
pub struct Iter<'a, V, D> {
    tree: &'a MTree<V, D>,
    stack: Vec<NodeId>,
}

impl<'a, V, D> Iterator for Iter<'a, V, D> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        while let Some(id) = self.stack.pop() {
            let node = &self.tree.nodes[id.0];
            match &node.kind {
                NodeKind::Value => return Some(&node.router),
                NodeKind::Router { children } => {
                    self.stack.extend(children.iter().rev().copied());
                }
            }
        }
        None
    }
}

impl<'a, V, D> IntoIterator for &'a MTree<V, D>
where
    V: Clone + PartialEq,
    D: DistanceValue,
{
    type Item = &'a V;
    type IntoIter = Iter<'a, V, D>;

    fn into_iter(self) -> Iter<'a, V, D> {
        self.iter()
    }
}

#[cfg(test)]
impl<V, D> MTree<V, D>
where
    V: Clone + PartialEq,
    D: DistanceValue,
{
    /// Panic on any structural invariant violation. Test-only; a failure
    /// here means an implementation bug that would corrupt pruning.
    pub(crate) fn check_invariants(&self) {
        let root = match self.root {
            Some(root) => root,
            None => {
                assert!(self.nodes.is_empty());
                return;
            }
        };
        assert!(self.node(root).parent.is_none(), "root must have no parent");
        assert!(self.node(root).is_router(), "root must be a router");
        self.check_node(root);
    }

    fn check_node(&self, id: NodeId) {
        let node = self.node(id);
        assert!(node.radius >= D::ZERO);
        if !node.is_router() {
            return;
        }
        let children = node.children();
        assert!(!children.is_empty(), "router with no children");
        assert!(
            children.len() <= self.node_capacity,
            "router over capacity: {} > {}",
            children.len(),
            self.node_capacity
        );
        let first_is_router = self.node(children[0]).is_router();
        for &child in children {
            assert_eq!(
                self.node(child).is_router(),
                first_is_router,
                "mixed child kinds under one router"
            );
            assert_eq!(
                self.node(child).parent,
                Some(id),
                "child does not point back at its router"
            );
            self.check_node(child);
        }
        for value in self.subtree_values(id) {
            assert!(
                self.distance_to_value(id, &value) <= node.radius,
                "covering invariant broken: value outside router radius"
            );
        }
    }

    fn subtree_values(&self, id: NodeId) -> Vec<V> {
        let node = self.node(id);
        if !node.is_router() {
            return vec![node.router.clone()];
        }
        node.children()
            .iter()
            .flat_map(|&child| self.subtree_values(child))
            .collect()
    }
}
