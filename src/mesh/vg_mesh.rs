//! Vector graphics mesh: topology plus nodes, attachments and gradient
//! constraints.
//!
//! [`VgMesh`] adds value semantics on top of a [`HalfEdgeMesh`]. It owns a
//! [`NodeStore`], an [`AttachmentTable`] mapping half-edge slots to nodes, and
//! an optional gradient constraint per vertex. The assignment of nodes to
//! slots may be sparse and locally inconsistent while a mesh is authored;
//! [`finalize`](crate::algo::finalize) completes it and
//! [`simplify`](crate::algo::simplify) reduces it again.
//!
//! # Example
//!
//! ```
//! use vgmesh::prelude::*;
//! use nalgebra::DVector;
//!
//! let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
//! let options = VgMeshOptions::default().with_coeffs(3);
//! let mut mesh: VgMesh = VgMesh::from_triangles(&vertices, &[[0, 1, 2]], &options).unwrap();
//!
//! let red = mesh.add_node(DVector::from_vec(vec![1.0, 0.0, 0.0])).unwrap();
//! let he = mesh.topology().face(FaceId::new(0)).halfedge;
//! mesh.set_from_vertex_value_node(he, red).unwrap();
//!
//! let stats = vgmesh::algo::finalize(&mut mesh);
//! assert_eq!(mesh.unset_slot_count(), 0);
//! assert!(stats.nodes_created > 0);
//! ```

use nalgebra::{DMatrix, DVector};

use super::attributes::{AttachmentTable, AttributeKind, Attributes};
use super::builder::build_from_triangles;
use super::halfedge::{HalfEdgeMesh, VertexFan};
use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, NodeId, VertexId};
use super::node::{NodeStore, NodeValue};
use crate::error::{MeshError, Result};

/// Configuration of a [`VgMesh`].
#[derive(Debug, Clone)]
pub struct VgMeshOptions {
    /// Number of coefficients per node value (4 for RGBA colors).
    pub coeffs: usize,

    /// Enabled attachment kinds.
    pub attributes: Attributes,

    /// Whether edge gradients are measured along each half-edge rather than
    /// along the canonical half-edge of their edge.
    pub halfedge_orientation: bool,
}

impl Default for VgMeshOptions {
    fn default() -> Self {
        Self {
            coeffs: 4,
            attributes: Attributes::QUADRATIC,
            halfedge_orientation: false,
        }
    }
}

impl VgMeshOptions {
    /// Set the number of value coefficients.
    pub fn with_coeffs(mut self, coeffs: usize) -> Self {
        self.coeffs = coeffs;
        self
    }

    /// Set the enabled attachment kinds.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set the edge gradient orientation convention.
    pub fn with_halfedge_orientation(mut self, halfedge_orientation: bool) -> Self {
        self.halfedge_orientation = halfedge_orientation;
        self
    }
}

/// One attachment slot: a half-edge and a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<I: MeshIndex = u32> {
    /// The half-edge holding the slot.
    pub halfedge: HalfEdgeId<I>,
    /// The kind of the slot.
    pub kind: AttributeKind,
}

impl<I: MeshIndex> Slot<I> {
    /// Create a slot.
    pub fn new(halfedge: HalfEdgeId<I>, kind: AttributeKind) -> Self {
        Self { halfedge, kind }
    }
}

/// A half-edge mesh carrying value nodes.
#[derive(Debug, Clone)]
pub struct VgMesh<I: MeshIndex = u32> {
    pub(crate) topology: HalfEdgeMesh<I>,
    pub(crate) nodes: NodeStore<I>,
    pub(crate) attachments: AttachmentTable<I>,
    pub(crate) gradients: Vec<Option<DMatrix<f64>>>,
    pub(crate) halfedge_orientation: bool,
}

impl<I: MeshIndex> VgMesh<I> {
    /// Wrap a topology. Every enabled slot starts unassigned.
    ///
    /// Fails with [`MeshError::CapacityExceeded`] when the index type cannot
    /// give every enabled slot a node of its own, since
    /// [`finalize`](crate::algo::finalize) may need that many.
    pub fn new(topology: HalfEdgeMesh<I>, options: &VgMeshOptions) -> Result<Self> {
        if options.coeffs == 0 {
            return Err(MeshError::invalid_param("coeffs", 0, "must be at least 1"));
        }
        if topology.dims() == 0 {
            return Err(MeshError::invalid_param("dims", 0, "must be at least 1"));
        }

        let nodes = NodeStore::new(options.coeffs);
        check_slot_capacity(&nodes, topology.num_halfedges(), options.attributes)?;

        Ok(Self {
            nodes,
            attachments: AttachmentTable::new(topology.num_halfedges(), options.attributes),
            gradients: vec![None; topology.num_vertices()],
            halfedge_orientation: options.halfedge_orientation,
            topology,
        })
    }

    /// Build the topology from a triangle list and wrap it.
    pub fn from_triangles<P: AsRef<[f64]>>(
        vertices: &[P],
        faces: &[[usize; 3]],
        options: &VgMeshOptions,
    ) -> Result<Self> {
        Self::new(build_from_triangles(vertices, faces)?, options)
    }

    // ==================== Configuration ====================

    /// The underlying topology.
    #[inline]
    pub fn topology(&self) -> &HalfEdgeMesh<I> {
        &self.topology
    }

    /// Domain dimension of positions.
    #[inline]
    pub fn dims(&self) -> usize {
        self.topology.dims()
    }

    /// Number of coefficients per node value.
    #[inline]
    pub fn coeffs(&self) -> usize {
        self.nodes.coeffs()
    }

    /// The enabled-attribute mask.
    #[inline]
    pub fn attributes(&self) -> Attributes {
        self.attachments.attributes()
    }

    /// Whether an attachment kind is enabled.
    #[inline]
    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attributes().has(kind)
    }

    /// Change the enabled kinds. Slots of disabled kinds are dropped and the
    /// nodes they referenced may become unused.
    ///
    /// Fails, leaving the mesh unchanged, when the new slot count exceeds the
    /// node capacity of the index type.
    pub fn set_attributes(&mut self, attributes: Attributes) -> Result<()> {
        check_slot_capacity(&self.nodes, self.topology.num_halfedges(), attributes)?;
        log::debug!("attributes {:?} -> {:?}", self.attributes(), attributes);
        self.attachments.set_attributes(attributes);
        Ok(())
    }

    /// Edge gradient orientation convention.
    #[inline]
    pub fn halfedge_orientation(&self) -> bool {
        self.halfedge_orientation
    }

    /// Set the edge gradient orientation convention.
    pub fn set_halfedge_orientation(&mut self, halfedge_orientation: bool) {
        self.halfedge_orientation = halfedge_orientation;
    }

    /// Sign converting an edge gradient node read at `he` into the frame of
    /// the canonical half-edge of its edge.
    #[inline]
    pub fn edge_gradient_sign(&self, he: HalfEdgeId<I>) -> f64 {
        if self.halfedge_orientation && !he.is_canonical() {
            -1.0
        } else {
            1.0
        }
    }

    // ==================== Nodes ====================

    /// Read-only access to the node store.
    #[inline]
    pub fn nodes(&self) -> &NodeStore<I> {
        &self.nodes
    }

    /// Number of nodes, referenced or not.
    #[inline]
    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over all node handles.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId<I>> + '_ {
        self.nodes.node_ids()
    }

    /// Add a constraint node.
    pub fn add_node(&mut self, value: DVector<f64>) -> Result<NodeId<I>> {
        self.nodes.add(NodeValue::Constraint(value))
    }

    /// Add an unknown node.
    pub fn add_unknown_node(&mut self) -> Result<NodeId<I>> {
        self.nodes.add_unknown()
    }

    /// Whether `node` names a node of this mesh.
    #[inline]
    pub fn is_valid_node(&self, node: NodeId<I>) -> bool {
        self.nodes.contains(node)
    }

    /// The value of a node.
    pub fn node_value(&self, node: NodeId<I>) -> Result<&NodeValue> {
        self.nodes.value(node)
    }

    /// Overwrite the value of a node.
    pub fn set_node_value(&mut self, node: NodeId<I>, value: NodeValue) -> Result<()> {
        self.nodes.set_value(node, value)
    }

    /// Whether a node is a constraint rather than an unknown.
    pub fn is_constraint(&self, node: NodeId<I>) -> Result<bool> {
        Ok(self.nodes.value(node)?.is_constraint())
    }

    // ==================== Attachments ====================

    /// Read-only access to the attachment table.
    #[inline]
    pub fn attachments(&self) -> &AttachmentTable<I> {
        &self.attachments
    }

    /// The node attached to a half-edge slot; invalid if unassigned.
    pub fn halfedge_node(&self, he: HalfEdgeId<I>, kind: AttributeKind) -> Result<NodeId<I>> {
        self.attachments.get(he, kind)
    }

    /// Attach a node to a half-edge slot. Pass an invalid handle to clear it.
    pub fn set_halfedge_node(
        &mut self,
        he: HalfEdgeId<I>,
        kind: AttributeKind,
        node: NodeId<I>,
    ) -> Result<()> {
        if node.is_valid() && !self.nodes.contains(node) {
            return Err(MeshError::invalid_handle("node", node.index()));
        }
        self.attachments.set(he, kind, node)
    }

    /// The node in the slot facing `(he, kind)` across the edge.
    pub fn halfedge_opposite_node(
        &self,
        he: HalfEdgeId<I>,
        kind: AttributeKind,
    ) -> Result<NodeId<I>> {
        self.check_halfedge(he)?;
        self.attachments.get(self.topology.twin(he), kind.opposite())
    }

    /// Value node at the destination vertex of `he`.
    pub fn to_vertex_value_node(&self, he: HalfEdgeId<I>) -> Result<NodeId<I>> {
        self.halfedge_node(he, AttributeKind::ToVertexValue)
    }

    /// Set the value node at the destination vertex of `he`.
    pub fn set_to_vertex_value_node(&mut self, he: HalfEdgeId<I>, node: NodeId<I>) -> Result<()> {
        self.set_halfedge_node(he, AttributeKind::ToVertexValue, node)
    }

    /// Value node at the origin vertex of `he`.
    pub fn from_vertex_value_node(&self, he: HalfEdgeId<I>) -> Result<NodeId<I>> {
        self.halfedge_node(he, AttributeKind::FromVertexValue)
    }

    /// Set the value node at the origin vertex of `he`.
    pub fn set_from_vertex_value_node(
        &mut self,
        he: HalfEdgeId<I>,
        node: NodeId<I>,
    ) -> Result<()> {
        self.set_halfedge_node(he, AttributeKind::FromVertexValue, node)
    }

    /// Edge value node on the side of `he`.
    pub fn edge_value_node(&self, he: HalfEdgeId<I>) -> Result<NodeId<I>> {
        self.halfedge_node(he, AttributeKind::EdgeValue)
    }

    /// Set the edge value node on the side of `he`.
    pub fn set_edge_value_node(&mut self, he: HalfEdgeId<I>, node: NodeId<I>) -> Result<()> {
        self.set_halfedge_node(he, AttributeKind::EdgeValue, node)
    }

    /// Edge gradient node on the side of `he`.
    pub fn edge_gradient_node(&self, he: HalfEdgeId<I>) -> Result<NodeId<I>> {
        self.halfedge_node(he, AttributeKind::EdgeGradient)
    }

    /// Set the edge gradient node on the side of `he`.
    pub fn set_edge_gradient_node(&mut self, he: HalfEdgeId<I>, node: NodeId<I>) -> Result<()> {
        self.set_halfedge_node(he, AttributeKind::EdgeGradient, node)
    }

    /// Number of enabled slots on face half-edges that hold no node.
    pub fn unset_slot_count(&self) -> usize {
        self.attributes()
            .kinds()
            .map(|kind| {
                self.topology
                    .halfedge_ids()
                    .filter(|&he| !self.topology.is_boundary_halfedge(he))
                    .filter(|&he| !self.slot_node(Slot::new(he, kind)).is_valid())
                    .count()
            })
            .sum()
    }

    // ==================== Arcs ====================

    /// Attach `node` to every corner slot around the shared origin of `h0`
    /// and `h1`, for the corners from `h0` counter-clockwise up to (not
    /// including) `h1`. `h0 == h1` covers the whole vertex.
    pub fn set_vertex_arc(
        &mut self,
        node: NodeId<I>,
        h0: HalfEdgeId<I>,
        h1: HalfEdgeId<I>,
    ) -> Result<()> {
        if !self.nodes.contains(node) {
            return Err(MeshError::invalid_handle("node", node.index()));
        }
        self.check_vertex_kinds()?;

        for he in self.arc(h0, h1)? {
            if self.topology.is_boundary_halfedge(he) {
                continue;
            }
            self.set_corner(he, node, node);
        }
        Ok(())
    }

    /// Author a singularity around the shared origin of `h0` and `h1`.
    ///
    /// The value turns from `n0` (along `h0`) to `n1` (along `h1`) across the
    /// corners of the arc `[h0, h1)`, interpolated by corner angle. Every
    /// interior edge of the arc gets a fresh constraint node shared by the two
    /// corners it separates. Both endpoints must be constraints.
    pub fn set_singularity_arc(
        &mut self,
        n0: NodeId<I>,
        n1: NodeId<I>,
        h0: HalfEdgeId<I>,
        h1: HalfEdgeId<I>,
    ) -> Result<()> {
        self.check_vertex_kinds()?;
        let v0 = self.constraint_of(n0)?.clone();
        let v1 = self.constraint_of(n1)?.clone();

        // Corners exist on face half-edges only, so the endpoints go on the
        // first and last of those
        let mut arc = self.arc(h0, h1)?;
        while arc.last().is_some_and(|&he| self.topology.is_boundary_halfedge(he)) {
            arc.pop();
        }
        let first = arc
            .iter()
            .position(|&he| !self.topology.is_boundary_halfedge(he))
            .unwrap_or(arc.len());
        arc.drain(..first);
        if arc.is_empty() {
            return Ok(());
        }
        self.nodes.check_capacity(arc.len() + 1)?;

        let angles: Vec<f64> = arc.iter().map(|&he| self.topology.corner_angle(he)).collect();

        // Node at each edge position of the arc, position k lying along arc[k]
        // and position arc.len() along the half-edge after the last corner
        let positions = spread_positions(&angles);
        let last = arc.len();
        let mut edge_nodes = vec![NodeId::invalid(); last + 1];
        edge_nodes[0] = n0;
        edge_nodes[last] = n1;

        for (k, &he) in arc.iter().enumerate() {
            if self.topology.is_boundary_halfedge(he) {
                continue;
            }
            for pos in [k, k + 1] {
                if !edge_nodes[pos].is_valid() {
                    let value = &v0 + (&v1 - &v0) * positions[pos];
                    edge_nodes[pos] = self.nodes.push(NodeValue::Constraint(value));
                }
            }
            self.set_corner(he, edge_nodes[k], edge_nodes[k + 1]);
        }

        log::trace!(
            "singularity arc at {:?} over {} corners",
            self.topology.origin(h0),
            last
        );
        Ok(())
    }

    // ==================== Singularities ====================

    /// Whether the face corner at the origin of `he` carries two different
    /// nodes.
    pub fn is_singular(&self, he: HalfEdgeId<I>) -> bool {
        if !self.has_attribute(AttributeKind::FromVertexValue)
            || !self.has_attribute(AttributeKind::ToVertexValue)
            || self.topology.is_boundary_halfedge(he)
        {
            return false;
        }
        let from = self.slot_node(Slot::new(he, AttributeKind::FromVertexValue));
        let to = self.slot_node(Slot::new(self.topology.prev(he), AttributeKind::ToVertexValue));
        from.is_valid() && to.is_valid() && from != to
    }

    /// Whether any corner of a face is singular.
    pub fn is_singular_face(&self, f: FaceId<I>) -> bool {
        self.topology.face_halfedges(f).any(|he| self.is_singular(he))
    }

    /// Number of faces with at least one singular corner.
    pub fn singular_faces_count(&self) -> usize {
        self.topology.face_ids().filter(|&f| self.is_singular_face(f)).count()
    }

    // ==================== Gradient constraints ====================

    /// Whether a vertex carries a gradient constraint.
    pub fn has_gradient_constraint(&self, v: VertexId<I>) -> bool {
        matches!(self.gradients.get(v.index()), Some(Some(_)))
    }

    /// The gradient constraint of a vertex, a `coeffs x dims` matrix.
    pub fn gradient_constraint(&self, v: VertexId<I>) -> Result<&DMatrix<f64>> {
        self.check_vertex(v)?;
        self.gradients[v.index()]
            .as_ref()
            .ok_or(MeshError::NoGradientConstraint { vertex: v.index() })
    }

    /// Set the gradient constraint of a vertex.
    pub fn set_gradient_constraint(&mut self, v: VertexId<I>, gradient: DMatrix<f64>) -> Result<()> {
        self.check_vertex(v)?;
        if gradient.nrows() != self.coeffs() {
            return Err(MeshError::DimensionMismatch {
                what: "gradient rows",
                expected: self.coeffs(),
                actual: gradient.nrows(),
            });
        }
        if gradient.ncols() != self.dims() {
            return Err(MeshError::DimensionMismatch {
                what: "gradient columns",
                expected: self.dims(),
                actual: gradient.ncols(),
            });
        }
        self.gradients[v.index()] = Some(gradient);
        Ok(())
    }

    /// Remove the gradient constraint of a vertex, returning it.
    pub fn remove_gradient_constraint(&mut self, v: VertexId<I>) -> Result<Option<DMatrix<f64>>> {
        self.check_vertex(v)?;
        Ok(self.gradients[v.index()].take())
    }

    /// Number of vertices with a gradient constraint.
    pub fn gradient_constraints_count(&self) -> usize {
        self.gradients.iter().filter(|g| g.is_some()).count()
    }

    // ==================== Internals ====================

    /// The node in an enabled slot of an in-range half-edge.
    #[inline]
    pub(crate) fn slot_node(&self, slot: Slot<I>) -> NodeId<I> {
        self.attachments
            .get(slot.halfedge, slot.kind)
            .unwrap_or_else(|_| NodeId::invalid())
    }

    #[inline]
    pub(crate) fn set_slot_node(&mut self, slot: Slot<I>, node: NodeId<I>) {
        let written = self.attachments.set(slot.halfedge, slot.kind, node);
        debug_assert!(written.is_ok(), "slot {:?} is disabled or out of range", slot);
    }

    /// Corner slots around a fan, counter-clockwise: for each corner, the
    /// from-vertex slot of the outgoing half-edge then the to-vertex slot of
    /// the incoming one. Disabled kinds are skipped.
    pub(crate) fn fan_slots(&self, fan: &VertexFan<I>) -> Vec<Slot<I>> {
        let from = self.has_attribute(AttributeKind::FromVertexValue);
        let to = self.has_attribute(AttributeKind::ToVertexValue);

        let mut slots = Vec::with_capacity(fan.halfedges.len() * 2);
        for &he in &fan.halfedges {
            if from {
                slots.push(Slot::new(he, AttributeKind::FromVertexValue));
            }
            if to {
                slots.push(Slot::new(self.topology.prev(he), AttributeKind::ToVertexValue));
            }
        }
        slots
    }

    /// Slots of an edge kind on the face sides of an edge.
    pub(crate) fn edge_slots(&self, e: EdgeId<I>, kind: AttributeKind) -> Vec<Slot<I>> {
        [e.halfedge(0), e.halfedge(1)]
            .into_iter()
            .filter(|&he| !self.topology.is_boundary_halfedge(he))
            .map(|he| Slot::new(he, kind))
            .collect()
    }

    /// The outgoing half-edge along which a corner slot lies.
    #[inline]
    pub(crate) fn slot_direction(&self, slot: Slot<I>) -> HalfEdgeId<I> {
        match slot.kind {
            AttributeKind::ToVertexValue => self.topology.twin(slot.halfedge),
            _ => slot.halfedge,
        }
    }

    fn set_corner(&mut self, he: HalfEdgeId<I>, from: NodeId<I>, to: NodeId<I>) {
        if self.has_attribute(AttributeKind::FromVertexValue) {
            self.set_slot_node(Slot::new(he, AttributeKind::FromVertexValue), from);
        }
        if self.has_attribute(AttributeKind::ToVertexValue) {
            let prev = self.topology.prev(he);
            self.set_slot_node(Slot::new(prev, AttributeKind::ToVertexValue), to);
        }
    }

    /// Outgoing half-edges from `h0` counter-clockwise up to `h1` (excluded).
    fn arc(&self, h0: HalfEdgeId<I>, h1: HalfEdgeId<I>) -> Result<Vec<HalfEdgeId<I>>> {
        self.check_halfedge(h0)?;
        self.check_halfedge(h1)?;
        if self.topology.origin(h0) != self.topology.origin(h1) {
            return Err(MeshError::invalid_param(
                "h1",
                format!("{:?}", h1),
                "arc half-edges must share their origin",
            ));
        }

        let mut arc = vec![h0];
        let mut he = self.topology.ccw_rotated(h0);
        while he != h1 && he != h0 {
            arc.push(he);
            he = self.topology.ccw_rotated(he);
        }
        Ok(arc)
    }

    fn constraint_of(&self, node: NodeId<I>) -> Result<&DVector<f64>> {
        self.nodes.value(node)?.as_constraint().ok_or_else(|| {
            MeshError::invalid_param(
                "node",
                format!("{:?}", node),
                "singularity endpoints must be constraints",
            )
        })
    }

    fn check_vertex_kinds(&self) -> Result<()> {
        if self.has_attribute(AttributeKind::FromVertexValue)
            || self.has_attribute(AttributeKind::ToVertexValue)
        {
            Ok(())
        } else {
            Err(MeshError::AttributeDisabled {
                attribute: AttributeKind::FromVertexValue,
            })
        }
    }

    fn check_halfedge(&self, he: HalfEdgeId<I>) -> Result<()> {
        if self.topology.contains_halfedge(he) {
            Ok(())
        } else {
            Err(MeshError::invalid_handle("halfedge", he.index()))
        }
    }

    fn check_vertex(&self, v: VertexId<I>) -> Result<()> {
        if self.topology.contains_vertex(v) {
            Ok(())
        } else {
            Err(MeshError::invalid_handle("vertex", v.index()))
        }
    }
}

fn check_slot_capacity<I: MeshIndex>(
    nodes: &NodeStore<I>,
    num_halfedges: usize,
    attributes: Attributes,
) -> Result<()> {
    let requested = attributes.kinds().count().saturating_mul(num_halfedges);
    if requested > nodes.capacity() {
        return Err(MeshError::CapacityExceeded {
            what: "attachment slot",
            requested,
            capacity: nodes.capacity(),
        });
    }
    Ok(())
}

/// Normalized positions of the edges bounding consecutive corners, from 0 at
/// the first edge to 1 at the last. Uniform when the corners have no angle.
pub(crate) fn spread_positions(angles: &[f64]) -> Vec<f64> {
    let total: f64 = angles.iter().sum();
    let count = angles.len().max(1) as f64;

    let mut positions = Vec::with_capacity(angles.len() + 1);
    let mut acc = 0.0;
    positions.push(0.0);
    for (k, angle) in angles.iter().enumerate() {
        acc += angle;
        let t = if total > f64::EPSILON && total.is_finite() {
            acc / total
        } else {
            (k + 1) as f64 / count
        };
        positions.push(t);
    }
    positions
}
