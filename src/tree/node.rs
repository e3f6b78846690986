/// Index of a node inside the tree's arena. Nodes are only ever created,
/// never removed, so an id stays valid for the life of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    /// Terminal wrapper around exactly one stored value.
    Value,
    /// Subtree representative with a bounded, homogeneous child list.
    Router { children: Vec<NodeId> },
}

/// A node of the metric tree. `router` is the representative value: for a
/// value node the stored value itself, for a router node one of the values
/// promoted from its subtree. `radius` is the covering radius; it is zero
/// for value nodes. The parent link is a plain index used only for upward
/// traversal, never for ownership.
#[derive(Debug, Clone)]
pub(crate) struct Node<V, D> {
    pub(crate) router: V,
    pub(crate) radius: D,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl<V, D> Node<V, D> {
    pub(crate) fn is_router(&self) -> bool {
        matches!(self.kind, NodeKind::Router { .. })
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Value => &[],
            NodeKind::Router { children } => children,
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        match &mut self.kind {
            NodeKind::Value => panic!("value nodes have no children"),
            NodeKind::Router { children } => children,
        }
    }
}
