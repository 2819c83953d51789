//! Reduction of a complete node assignment.
//!
//! [`simplify`] clears every slot that [`finalize`](super::finalize) would
//! reconstruct, so a finalized mesh can be stored or edited in a compact form:
//!
//! - an edge whose sides share one unknown used nowhere else is cleared;
//! - two distinct constraints with equal values on the sides of an edge, or
//!   on neighbouring corner slots, are collapsed onto one handle;
//! - around a vertex, each block of slots sharing a handle keeps only the
//!   slots that bound it, and a vertex holding a single unknown used nowhere
//!   else is cleared entirely.
//!
//! Only fans and edges whose slots are all assigned are reduced. Nodes left
//! unreferenced are deleted at the end. `finalize(simplify(m))` yields the
//! same values in every slot as `m`, up to the renaming of unknowns.

use super::gc::{delete_unused_nodes, reference_counts};
use crate::mesh::{AttributeKind, EdgeId, MeshIndex, NodeId, VertexFan, VertexId, VgMesh};

/// Outcome of a [`simplify`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyStats {
    /// Slots reset to unassigned.
    pub slots_cleared: usize,
    /// Slots moved onto an equal-valued constraint handle.
    pub handles_collapsed: usize,
    /// Nodes deleted once no slot referenced them.
    pub nodes_removed: usize,
}

/// Clear redundant slots and delete the nodes no slot references anymore.
///
/// # Example
///
/// ```
/// use vgmesh::prelude::*;
///
/// let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
/// let mut mesh: VgMesh = VgMesh::from_triangles(&vertices, &[[0, 1, 2]], &VgMeshOptions::default()).unwrap();
///
/// finalize(&mut mesh);
/// let stats = simplify(&mut mesh);
/// assert_eq!(stats.nodes_removed, 6);
/// assert_eq!(mesh.nodes_count(), 0);
/// ```
pub fn simplify<I: MeshIndex>(mesh: &mut VgMesh<I>) -> SimplifyStats {
    let refs = reference_counts(mesh);
    let mut stats = SimplifyStats::default();

    for kind in AttributeKind::EDGE_KINDS {
        if mesh.has_attribute(kind) {
            simplify_edges(mesh, kind, &refs, &mut stats);
        }
    }

    for v in 0..mesh.topology.num_vertices() {
        if let Some(fan) = mesh.topology.vertex_fan(VertexId::new(v)) {
            simplify_fan(mesh, &fan, &refs, &mut stats);
        }
    }

    stats.nodes_removed = delete_unused_nodes(mesh).removed();

    log::debug!(
        "simplify: {} slots cleared, {} handles collapsed, {} nodes removed",
        stats.slots_cleared,
        stats.handles_collapsed,
        stats.nodes_removed
    );
    stats
}

/// Whether `node` is an unknown referenced by exactly `local` slots, that is
/// by nothing outside the slots being reduced.
fn is_local_unknown<I: MeshIndex>(
    mesh: &VgMesh<I>,
    refs: &[usize],
    node: NodeId<I>,
    local: usize,
) -> bool {
    !mesh.nodes.is_constraint_at(node) && refs.get(node.index()).copied() == Some(local)
}

fn simplify_edges<I: MeshIndex>(
    mesh: &mut VgMesh<I>,
    kind: AttributeKind,
    refs: &[usize],
    stats: &mut SimplifyStats,
) {
    for e in 0..mesh.topology.num_edges() {
        let sides = mesh.edge_slots(EdgeId::new(e), kind);
        let nodes: Vec<NodeId<I>> = sides.iter().map(|&s| mesh.slot_node(s)).collect();
        if nodes.is_empty() || nodes.iter().any(|n| !n.is_valid()) {
            continue;
        }

        let first = nodes[0];
        if nodes.iter().all(|&n| n == first) {
            if is_local_unknown(mesh, refs, first, nodes.len()) {
                for &slot in &sides {
                    mesh.set_slot_node(slot, NodeId::invalid());
                }
                stats.slots_cleared += sides.len();
            }
        } else if mesh.nodes.is_constraint_at(first) && mesh.nodes.same_value(first, nodes[1]) {
            mesh.set_slot_node(sides[1], first);
            stats.handles_collapsed += 1;
        }
    }
}

fn simplify_fan<I: MeshIndex>(
    mesh: &mut VgMesh<I>,
    fan: &VertexFan<I>,
    refs: &[usize],
    stats: &mut SimplifyStats,
) {
    let slots = mesh.fan_slots(fan);
    let original: Vec<NodeId<I>> = slots.iter().map(|&s| mesh.slot_node(s)).collect();
    if original.is_empty() || original.iter().any(|n| !n.is_valid()) {
        return;
    }

    let mut nodes = original.clone();
    collapse_equal_constraints(mesh, &mut nodes, fan.closed);
    for (i, (&old, &new)) in original.iter().zip(&nodes).enumerate() {
        if old != new {
            mesh.set_slot_node(slots[i], new);
            stats.handles_collapsed += 1;
        }
    }

    let blocks = handle_blocks(&nodes, fan.closed);
    let mut clear = Vec::new();

    if let [block] = blocks.as_slice() {
        if is_local_unknown(mesh, refs, nodes[block[0]], nodes.len()) {
            clear.extend_from_slice(block);
        } else {
            clear.extend_from_slice(&block[1..]);
        }
    } else {
        let last = blocks.len() - 1;
        for (k, block) in blocks.iter().enumerate() {
            let n = block.len();
            match (fan.closed, k) {
                // An open fan is rebuilt outwards from its extreme blocks
                (false, 0) => clear.extend_from_slice(&block[..n - 1]),
                (false, k) if k == last => clear.extend_from_slice(&block[1..]),
                _ if n > 2 => clear.extend_from_slice(&block[1..n - 1]),
                _ => {}
            }
        }
    }

    for &i in &clear {
        mesh.set_slot_node(slots[i], NodeId::invalid());
    }
    stats.slots_cleared += clear.len();
}

/// Move each constraint onto the handle of its predecessor in the walk when
/// both carry the same value.
fn collapse_equal_constraints<I: MeshIndex>(mesh: &VgMesh<I>, nodes: &mut [NodeId<I>], closed: bool) {
    let len = nodes.len();
    let equal = |a: NodeId<I>, b: NodeId<I>| {
        a != b && mesh.nodes.is_constraint_at(a) && mesh.nodes.same_value(a, b)
    };

    for i in 1..len {
        if equal(nodes[i - 1], nodes[i]) {
            nodes[i] = nodes[i - 1];
        }
    }

    // The leading block joins the trailing one across the wrap
    if closed && equal(nodes[len - 1], nodes[0]) {
        let (old, new) = (nodes[0], nodes[len - 1]);
        for node in nodes.iter_mut().take_while(|n| **n == old) {
            *node = new;
        }
    }
}

/// Maximal blocks of consecutive slots sharing a handle, as slot indices in
/// walk order. A closed fan starts its first block at a handle change so no
/// block straddles the wrap.
fn handle_blocks<I: MeshIndex>(nodes: &[NodeId<I>], closed: bool) -> Vec<Vec<usize>> {
    let len = nodes.len();
    let start = if closed {
        match (0..len).find(|&i| nodes[i] != nodes[(i + len - 1) % len]) {
            Some(i) => i,
            None => return vec![(0..len).collect()],
        }
    } else {
        0
    };

    let mut blocks: Vec<Vec<usize>> = Vec::new();
    for d in 0..len {
        let i = (start + d) % len;
        match blocks.last_mut() {
            Some(block) if nodes[block[0]] == nodes[i] => block.push(i),
            _ => blocks.push(vec![i]),
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::finalize;
    use crate::mesh::{Attributes, HalfEdgeId, Slot, VgMeshOptions};
    use nalgebra::DVector;

    /// Center vertex 0 surrounded by four right-angled triangles.
    fn fan(attributes: Attributes) -> VgMesh {
        let vertices = [
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [-1.0, 0.0],
            [0.0, -1.0],
        ];
        let faces = [[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 1]];
        let options = VgMeshOptions::default().with_coeffs(1).with_attributes(attributes);
        VgMesh::from_triangles(&vertices, &faces, &options).unwrap()
    }

    fn gray(mesh: &mut VgMesh, level: f64) -> NodeId {
        mesh.add_node(DVector::from_element(1, level)).unwrap()
    }

    fn spoke(mesh: &VgMesh, to: usize) -> HalfEdgeId {
        mesh.topology()
            .vertex_halfedges(VertexId::new(0))
            .find(|&he| mesh.topology().dest(he).index() == to)
            .unwrap()
    }

    /// Constraint value in every face slot, `None` for unknowns.
    fn face_values(mesh: &VgMesh) -> Vec<Option<f64>> {
        let mut values = Vec::new();
        for kind in mesh.attributes().kinds() {
            for he in mesh.topology().halfedge_ids() {
                if mesh.topology().is_boundary_halfedge(he) {
                    continue;
                }
                let node = mesh.slot_node(Slot::new(he, kind));
                values.push(mesh.node_value(node).unwrap().as_constraint().map(|v| v[0]));
            }
        }
        values
    }

    #[test]
    fn test_unknowns_are_cleared() {
        let mut mesh = fan(Attributes::QUADRATIC);
        finalize(&mut mesh);
        let created = mesh.nodes_count();

        let stats = simplify(&mut mesh);
        assert_eq!(stats.nodes_removed, created);
        assert_eq!(mesh.nodes_count(), 0);
        assert_eq!(mesh.unset_slot_count(), 36);
    }

    #[test]
    fn test_constant_vertex_keeps_one_slot() {
        let mut mesh = fan(Attributes::LINEAR);
        let red = gray(&mut mesh, 1.0);
        let h1 = spoke(&mesh, 1);
        mesh.set_vertex_arc(red, h1, h1).unwrap();

        simplify(&mut mesh);
        let fan = mesh.topology().vertex_fan(VertexId::new(0)).unwrap();
        let kept = mesh
            .fan_slots(&fan)
            .iter()
            .filter(|&&s| mesh.slot_node(s).is_valid())
            .count();
        assert_eq!(kept, 1);
        assert_eq!(mesh.nodes_count(), 1);
    }

    #[test]
    fn test_singularity_keeps_block_ends() {
        let mut mesh = fan(Attributes::LINEAR);
        let black = gray(&mut mesh, 0.0);
        let white = gray(&mut mesh, 1.0);
        let (h1, h3) = (spoke(&mesh, 1), spoke(&mesh, 3));
        mesh.set_vertex_arc(black, h1, h3).unwrap();
        mesh.set_vertex_arc(white, h3, h1).unwrap();

        let stats = simplify(&mut mesh);
        // Two blocks of four slots, each keeping its two ends
        let fan = mesh.topology().vertex_fan(VertexId::new(0)).unwrap();
        let kept = mesh
            .fan_slots(&fan)
            .iter()
            .filter(|&&s| mesh.slot_node(s).is_valid())
            .count();
        assert_eq!(kept, 4);
        assert_eq!(stats.nodes_removed, 0);
    }

    #[test]
    fn test_equal_constraints_collapse() {
        let mut mesh = fan(Attributes::QUADRATIC);
        let a = gray(&mut mesh, 0.5);
        let b = gray(&mut mesh, 0.5);
        let he = spoke(&mesh, 2);
        let twin = mesh.topology().twin(he);
        mesh.set_edge_value_node(he, a).unwrap();
        mesh.set_edge_value_node(twin, b).unwrap();

        let stats = simplify(&mut mesh);
        assert_eq!(stats.handles_collapsed, 1);
        assert_eq!(stats.nodes_removed, 1);
        assert_eq!(mesh.edge_value_node(he).unwrap(), mesh.edge_value_node(twin).unwrap());
    }

    #[test]
    fn test_discontinuous_edge_untouched() {
        let mut mesh = fan(Attributes::MORLEY);
        let (p, q) = (mesh.add_unknown_node().unwrap(), mesh.add_unknown_node().unwrap());
        let he = spoke(&mesh, 4);
        let twin = mesh.topology().twin(he);
        mesh.set_edge_gradient_node(he, p).unwrap();
        mesh.set_edge_gradient_node(twin, q).unwrap();

        let stats = simplify(&mut mesh);
        assert_eq!(stats.slots_cleared, 0);
        assert_eq!(stats.nodes_removed, 0);
        assert!(mesh.edge_gradient_node(he).unwrap().is_valid());
        assert_ne!(mesh.edge_gradient_node(he).unwrap(), mesh.edge_gradient_node(twin).unwrap());
    }

    #[test]
    fn test_shared_unknown_is_kept() {
        let mut mesh = fan(Attributes::QUADRATIC);
        let free = mesh.add_unknown_node().unwrap();
        let h1 = spoke(&mesh, 1);
        mesh.set_vertex_arc(free, h1, h1).unwrap();
        // The same unknown also sits on an edge
        mesh.set_edge_value_node(mesh.topology().next(h1), free).unwrap();

        simplify(&mut mesh);
        assert_eq!(mesh.nodes_count(), 1);
        let fan = mesh.topology().vertex_fan(VertexId::new(0)).unwrap();
        let kept = mesh
            .fan_slots(&fan)
            .iter()
            .filter(|&&s| mesh.slot_node(s).is_valid())
            .count();
        assert_eq!(kept, 1);
    }

    #[test]
    fn test_roundtrip_preserves_values() {
        let mut mesh = fan(Attributes::FV);
        let black = gray(&mut mesh, 0.0);
        let white = gray(&mut mesh, 1.0);
        let edge = gray(&mut mesh, 0.25);
        let (h1, h3) = (spoke(&mesh, 1), spoke(&mesh, 3));
        mesh.set_from_vertex_value_node(h1, black).unwrap();
        mesh.set_from_vertex_value_node(h3, white).unwrap();
        mesh.set_edge_value_node(spoke(&mesh, 2), edge).unwrap();
        finalize(&mut mesh);
        let before = face_values(&mesh);

        simplify(&mut mesh);
        assert!(mesh.unset_slot_count() > 0);
        finalize(&mut mesh);
        assert_eq!(face_values(&mesh), before);
        assert_eq!(mesh.singular_faces_count(), 4);
    }

    #[test]
    fn test_handle_blocks() {
        let n = |i: usize| NodeId::<u32>::new(i);

        let open = handle_blocks(&[n(1), n(1), n(2), n(3), n(3)], false);
        assert_eq!(open, vec![vec![0, 1], vec![2], vec![3, 4]]);

        // The wrapped block starts at its first slot after the change
        let closed = handle_blocks(&[n(1), n(2), n(2), n(1)], true);
        assert_eq!(closed, vec![vec![1, 2], vec![3, 0]]);

        let uniform = handle_blocks(&[n(4), n(4), n(4)], true);
        assert_eq!(uniform, vec![vec![0, 1, 2]]);
    }
}
