//! Node store.
//!
//! Nodes are the values attached to a mesh. A node is either a constraint
//! (a concrete vector of coefficients) or an unknown the solver has to
//! determine. Nodes live in an arena and are addressed by [`NodeId`]; the
//! store never deletes a single node on request, because only a scan of
//! every attachment slot can tell whether a node is still referenced. See
//! [`delete_unused_nodes`](crate::algo::delete_unused_nodes).

use nalgebra::DVector;

use super::index::{MeshIndex, NodeId};
use crate::error::{MeshError, Result};

/// The value held by a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// A free unknown, solved for by the consumer of the mesh.
    Unconstrained,
    /// A fixed value (Dirichlet constraint).
    Constraint(DVector<f64>),
}

impl NodeValue {
    /// Whether this value is a constraint.
    #[inline]
    pub fn is_constraint(&self) -> bool {
        matches!(self, NodeValue::Constraint(_))
    }

    /// The constraint value, if any.
    #[inline]
    pub fn as_constraint(&self) -> Option<&DVector<f64>> {
        match self {
            NodeValue::Constraint(v) => Some(v),
            NodeValue::Unconstrained => None,
        }
    }
}

impl From<DVector<f64>> for NodeValue {
    fn from(v: DVector<f64>) -> Self {
        NodeValue::Constraint(v)
    }
}

/// Arena of node values with a fixed coefficient count.
#[derive(Debug, Clone)]
pub struct NodeStore<I: MeshIndex = u32> {
    coeffs: usize,
    values: Vec<NodeValue>,
    _index: std::marker::PhantomData<I>,
}

impl<I: MeshIndex> NodeStore<I> {
    /// Create an empty store for values with `coeffs` coefficients.
    pub fn new(coeffs: usize) -> Self {
        Self {
            coeffs,
            values: Vec::new(),
            _index: std::marker::PhantomData,
        }
    }

    /// Number of coefficients of every constraint value.
    #[inline]
    pub fn coeffs(&self) -> usize {
        self.coeffs
    }

    /// Number of nodes in the store.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no node.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether `node` names a node of this store.
    #[inline]
    pub fn contains(&self, node: NodeId<I>) -> bool {
        node.is_valid() && node.index() < self.values.len()
    }

    /// Iterate over all node handles.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId<I>> + '_ {
        (0..self.values.len()).map(NodeId::new)
    }

    /// Largest number of nodes the index type can address.
    #[inline]
    pub fn capacity(&self) -> usize {
        I::MAX.to_usize().saturating_add(1)
    }

    /// Add a node and return its handle.
    ///
    /// Fails with [`MeshError::CapacityExceeded`] once every handle of the
    /// index type is taken.
    pub fn add(&mut self, value: NodeValue) -> Result<NodeId<I>> {
        self.check_value(&value)?;
        self.check_capacity(1)?;
        Ok(self.push(value))
    }

    /// Add an unknown node.
    pub fn add_unknown(&mut self) -> Result<NodeId<I>> {
        self.add(NodeValue::Unconstrained)
    }

    /// Add a node whose size is known to match, with room known to be left.
    pub(crate) fn push(&mut self, value: NodeValue) -> NodeId<I> {
        debug_assert!(self.check_value(&value).is_ok());
        debug_assert!(self.values.len() < self.capacity());
        let id = NodeId::new(self.values.len());
        self.values.push(value);
        id
    }

    /// Fail unless `extra` more nodes fit.
    pub(crate) fn check_capacity(&self, extra: usize) -> Result<()> {
        let requested = self.values.len().saturating_add(extra);
        if requested > self.capacity() {
            return Err(MeshError::CapacityExceeded {
                what: "node",
                requested,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Read the value of a node.
    pub fn value(&self, node: NodeId<I>) -> Result<&NodeValue> {
        self.values
            .get(node.index())
            .filter(|_| node.is_valid())
            .ok_or_else(|| MeshError::invalid_handle("node", node.index()))
    }

    /// Overwrite the value of a node.
    pub fn set_value(&mut self, node: NodeId<I>, value: NodeValue) -> Result<()> {
        self.check_value(&value)?;
        if !self.contains(node) {
            return Err(MeshError::invalid_handle("node", node.index()));
        }
        self.values[node.index()] = value;
        Ok(())
    }

    #[inline]
    pub(crate) fn is_constraint_at(&self, node: NodeId<I>) -> bool {
        self.values
            .get(node.index())
            .is_some_and(NodeValue::is_constraint)
    }

    /// Whether two nodes carry the same value: the same handle, two equal
    /// constraints, or two unknowns.
    pub(crate) fn same_value(&self, a: NodeId<I>, b: NodeId<I>) -> bool {
        a == b || self.values[a.index()] == self.values[b.index()]
    }

    /// Keep the nodes flagged in `live`, in order, and return the old-to-new
    /// handle map. Dropped nodes map to an invalid handle.
    pub(crate) fn compact(&mut self, live: &[bool]) -> Vec<NodeId<I>> {
        debug_assert_eq!(live.len(), self.values.len());

        let mut remap = vec![NodeId::invalid(); self.values.len()];
        let mut kept = 0;
        for (old, &alive) in live.iter().enumerate() {
            if alive {
                remap[old] = NodeId::new(kept);
                self.values.swap(kept, old);
                kept += 1;
            }
        }
        self.values.truncate(kept);

        remap
    }

    fn check_value(&self, value: &NodeValue) -> Result<()> {
        match value {
            NodeValue::Constraint(v) if v.len() != self.coeffs => Err(MeshError::DimensionMismatch {
                what: "node value",
                expected: self.coeffs,
                actual: v.len(),
            }),
            _ => Ok(()),
        }
    }
}
