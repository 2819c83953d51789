//! Union-find over node handles.
//!
//! Finalize merges unknown nodes that bound the same unassigned run around a
//! vertex. Merges are recorded here and applied to every attachment slot in a
//! single relabeling pass, so a node merged at one vertex is also replaced
//! wherever else it is referenced.

use crate::mesh::{MeshIndex, NodeId};

/// Disjoint sets of node handles. Handles never merged are their own root,
/// including handles created after the structure was built.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeUnion {
    parent: Vec<usize>,
}

impl NodeUnion {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    /// Representative of the set containing `node`.
    pub(crate) fn find<I: MeshIndex>(&mut self, node: NodeId<I>) -> NodeId<I> {
        if !node.is_valid() {
            return node;
        }
        let mut i = node.index();
        if i >= self.parent.len() {
            return node;
        }
        // Path halving
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        NodeId::new(i)
    }

    /// Attach the root `from` under the root `into`.
    pub(crate) fn merge<I: MeshIndex>(&mut self, from: NodeId<I>, into: NodeId<I>) {
        debug_assert_eq!(self.find(from), from);
        debug_assert_eq!(self.find(into), into);

        let needed = from.index().max(into.index()) + 1;
        if self.parent.len() < needed {
            let start = self.parent.len();
            self.parent.extend(start..needed);
        }
        self.parent[from.index()] = into.index();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        let mut union = NodeUnion::new(3);
        let n: NodeId = NodeId::new(2);
        assert_eq!(union.find(n), n);
        // Handles beyond the initial size are roots too
        assert_eq!(union.find(NodeId::<u32>::new(10)), NodeId::new(10));
        assert!(!union.find(NodeId::<u32>::invalid()).is_valid());
    }

    #[test]
    fn test_chained_merges() {
        let mut union = NodeUnion::new(4);
        let [a, b, c, d]: [NodeId; 4] = [0, 1, 2, 3].map(NodeId::new);

        union.merge(b, a);
        union.merge(c, d);
        let root = union.find(c);
        let other = union.find(a);
        union.merge(other, root);

        for n in [a, b, c, d] {
            assert_eq!(union.find(n), d);
        }
    }

    #[test]
    fn test_merge_grows() {
        let mut union = NodeUnion::new(1);
        let late: NodeId = NodeId::new(5);
        union.merge(late, NodeId::new(0));
        assert_eq!(union.find(late), NodeId::new(0));
        assert_eq!(union.find(NodeId::<u32>::new(4)), NodeId::new(4));
    }
}
