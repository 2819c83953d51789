//! Completion of a partial node assignment.
//!
//! Authoring tools set only the slots they care about. [`finalize`] fills every
//! remaining slot on a face half-edge so that a solver sees a complete and
//! consistent assignment:
//!
//! 1. **Edge pass.** For each enabled edge kind, an edge with no node on
//!    either side gets one new unknown shared by both sides, and an edge with
//!    a node on one side only gets that node copied to the other side.
//! 2. **Vertex pass.** Around each vertex, the corner slots are walked
//!    counter-clockwise. A vertex with no node at all gets one new unknown.
//!    Otherwise every run of unassigned slots is bounded by two assigned
//!    slots `A` and `B`:
//!    - `A` and `B` carry the same value: the run takes `A`.
//!    - `A` and `B` are constraints with different values: the run becomes a
//!      singularity whose nodes are interpolated by corner angle.
//!    - otherwise the two nodes are merged into one, preferring the
//!      constraint, and the run takes the merged node. The merge is global:
//!      every slot of the mesh referencing the dropped node is rewritten.
//!
//! Open fans at boundary vertices are not wrapped: the runs before the first
//! and after the last assigned slot take that slot's node.
//!
//! Slots on boundary half-edges are never touched.
//!
//! Every node the pass creates fills at least one unassigned slot. When the
//! node store has fewer free handles than there are unassigned slots, unused
//! nodes are deleted first, which renumbers the surviving handles.

use std::iter;

use nalgebra::DVector;

use super::gc::delete_unused_nodes;
use super::union_find::NodeUnion;
use crate::mesh::{
    spread_positions, AttributeKind, EdgeId, MeshIndex, NodeId, NodeValue, Slot, VertexFan,
    VertexId, VgMesh,
};

/// Outcome of a [`finalize`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeStats {
    /// Nodes added, unknowns and interpolated constraints alike.
    pub nodes_created: usize,
    /// Slots that were unassigned and received a node.
    pub slots_filled: usize,
    /// Pairs of nodes merged into one.
    pub merges: usize,
    /// Runs resolved as singularities.
    pub singular_runs: usize,
}

/// Fill every unassigned slot on a face half-edge.
///
/// Existing assignments are kept except where a merge replaces an unknown by
/// the node it was merged into. Running the pass twice is a no-op the second
/// time.
///
/// # Example
///
/// ```
/// use vgmesh::prelude::*;
///
/// let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
/// let mut mesh: VgMesh = VgMesh::from_triangles(&vertices, &[[0, 1, 2]], &VgMeshOptions::default()).unwrap();
///
/// let stats = finalize(&mut mesh);
/// // One unknown per vertex and per edge
/// assert_eq!(stats.nodes_created, 6);
/// assert_eq!(mesh.unset_slot_count(), 0);
/// ```
pub fn finalize<I: MeshIndex>(mesh: &mut VgMesh<I>) -> FinalizeStats {
    let mut stats = FinalizeStats::default();

    if mesh.nodes.check_capacity(mesh.unset_slot_count()).is_err() {
        let gc = delete_unused_nodes(mesh);
        log::warn!(
            "finalize: node store nearly full, deleted {} unused nodes first",
            gc.removed()
        );
    }

    for kind in AttributeKind::EDGE_KINDS {
        if mesh.has_attribute(kind) {
            finalize_edges(mesh, kind, &mut stats);
        }
    }

    let mut union = NodeUnion::new(mesh.nodes.len());
    for v in 0..mesh.topology.num_vertices() {
        if let Some(fan) = mesh.topology.vertex_fan(VertexId::new(v)) {
            finalize_fan(mesh, &fan, &mut union, &mut stats);
        }
    }

    // Apply merges everywhere, not only around the vertices that caused them
    if stats.merges > 0 {
        for slot in mesh.attachments.slots_mut() {
            *slot = union.find(*slot);
        }
    }

    log::debug!(
        "finalize: {} slots filled, {} nodes created, {} merges, {} singular runs",
        stats.slots_filled,
        stats.nodes_created,
        stats.merges,
        stats.singular_runs
    );
    stats
}

fn finalize_edges<I: MeshIndex>(mesh: &mut VgMesh<I>, kind: AttributeKind, stats: &mut FinalizeStats) {
    for e in 0..mesh.topology.num_edges() {
        let sides = mesh.edge_slots(EdgeId::new(e), kind);
        let nodes: Vec<NodeId<I>> = sides.iter().map(|&s| mesh.slot_node(s)).collect();

        let fill = match nodes.iter().copied().find(|n| n.is_valid()) {
            _ if nodes.is_empty() => continue,
            // Both sides set, continuous or not
            Some(_) if nodes.iter().all(|n| n.is_valid()) => continue,
            Some(node) => node,
            None => {
                stats.nodes_created += 1;
                mesh.nodes.push(NodeValue::Unconstrained)
            }
        };

        for (&slot, node) in sides.iter().zip(&nodes) {
            if !node.is_valid() {
                mesh.set_slot_node(slot, fill);
                stats.slots_filled += 1;
            }
        }
    }
}

/// Unassigned slots bounded by two assigned ones, as indices into the fan
/// slots. `before` and `after` coincide when a single slot bounds the run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Run {
    before: usize,
    interior: Vec<usize>,
    after: usize,
}

fn finalize_fan<I: MeshIndex>(
    mesh: &mut VgMesh<I>,
    fan: &VertexFan<I>,
    union: &mut NodeUnion,
    stats: &mut FinalizeStats,
) {
    let slots = mesh.fan_slots(fan);
    if slots.is_empty() {
        return;
    }
    let nodes: Vec<NodeId<I>> = slots.iter().map(|&s| mesh.slot_node(s)).collect();
    let assigned: Vec<usize> = (0..nodes.len()).filter(|&i| nodes[i].is_valid()).collect();

    if assigned.is_empty() {
        let node = mesh.nodes.push(NodeValue::Unconstrained);
        for &slot in &slots {
            mesh.set_slot_node(slot, node);
        }
        stats.nodes_created += 1;
        stats.slots_filled += slots.len();
        return;
    }

    for run in fan_runs(fan.closed, &assigned, slots.len()) {
        resolve_run(mesh, &slots, &nodes, &run, union, stats);
    }
}

/// The runs of unassigned slots of a fan with `len` slots, given the sorted
/// indices of its assigned slots.
fn fan_runs(closed: bool, assigned: &[usize], len: usize) -> Vec<Run> {
    let mut runs = Vec::new();

    if closed {
        for (k, &before) in assigned.iter().enumerate() {
            let after = assigned[(k + 1) % assigned.len()];
            let interior: Vec<usize> = (1..len)
                .map(|d| (before + d) % len)
                .take_while(|&i| i != after)
                .collect();
            if !interior.is_empty() {
                runs.push(Run { before, interior, after });
            }
        }
        return runs;
    }

    let (first, last) = (assigned[0], assigned[assigned.len() - 1]);
    if first > 0 {
        runs.push(Run { before: first, interior: (0..first).collect(), after: first });
    }
    for pair in assigned.windows(2) {
        if pair[1] > pair[0] + 1 {
            runs.push(Run {
                before: pair[0],
                interior: (pair[0] + 1..pair[1]).collect(),
                after: pair[1],
            });
        }
    }
    if last + 1 < len {
        runs.push(Run { before: last, interior: (last + 1..len).collect(), after: last });
    }
    runs
}

fn resolve_run<I: MeshIndex>(
    mesh: &mut VgMesh<I>,
    slots: &[Slot<I>],
    nodes: &[NodeId<I>],
    run: &Run,
    union: &mut NodeUnion,
    stats: &mut FinalizeStats,
) {
    let a = union.find(nodes[run.before]);
    let b = union.find(nodes[run.after]);

    let fill = if a == b {
        a
    } else {
        match (mesh.nodes.is_constraint_at(a), mesh.nodes.is_constraint_at(b)) {
            (true, true) if mesh.nodes.same_value(a, b) => a,
            (true, true) => {
                fill_singular(mesh, slots, run, a, b, stats);
                return;
            }
            // Constraints always stay roots
            (false, true) => {
                log::trace!("merging unknown {:?} into constraint {:?}", a, b);
                union.merge(a, b);
                stats.merges += 1;
                b
            }
            _ => {
                log::trace!("merging {:?} into {:?}", b, a);
                union.merge(b, a);
                stats.merges += 1;
                a
            }
        }
    };

    for &i in &run.interior {
        mesh.set_slot_node(slots[i], fill);
    }
    stats.slots_filled += run.interior.len();
}

/// Interpolate between two constraints across a run. Slots lying along the
/// same edge share one node so the value stays continuous across that edge.
fn fill_singular<I: MeshIndex>(
    mesh: &mut VgMesh<I>,
    slots: &[Slot<I>],
    run: &Run,
    a: NodeId<I>,
    b: NodeId<I>,
    stats: &mut FinalizeStats,
) {
    let (Some(va), Some(vb)) = (constraint(mesh, a), constraint(mesh, b)) else {
        return;
    };

    let walk: Vec<Slot<I>> = iter::once(slots[run.before])
        .chain(run.interior.iter().map(|&i| slots[i]))
        .chain(iter::once(slots[run.after]))
        .collect();
    let directions: Vec<_> = walk.iter().map(|&s| mesh.slot_direction(s)).collect();
    let steps: Vec<f64> = directions
        .windows(2)
        .map(|d| if d[0] == d[1] { 0.0 } else { mesh.topology.corner_angle(d[0]) })
        .collect();
    let positions = spread_positions(&steps);

    let mut current = NodeId::invalid();
    for k in 1..=run.interior.len() {
        if !current.is_valid() || directions[k] != directions[k - 1] {
            let value = &va + (&vb - &va) * positions[k];
            current = mesh.nodes.push(NodeValue::Constraint(value));
            stats.nodes_created += 1;
        }
        mesh.set_slot_node(walk[k], current);
    }

    log::trace!(
        "singular run of {} slots between {:?} and {:?}",
        run.interior.len(),
        a,
        b
    );
    stats.slots_filled += run.interior.len();
    stats.singular_runs += 1;
}

fn constraint<I: MeshIndex>(mesh: &VgMesh<I>, node: NodeId<I>) -> Option<DVector<f64>> {
    mesh.nodes
        .value(node)
        .ok()
        .and_then(|value| value.as_constraint())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MeshError, Result};
    use crate::mesh::{Attributes, HalfEdgeId, VgMeshOptions};

    fn triangle(attributes: Attributes) -> VgMesh {
        let vertices = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let options = VgMeshOptions::default().with_coeffs(1).with_attributes(attributes);
        VgMesh::from_triangles(&vertices, &[[0, 1, 2]], &options).unwrap()
    }

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

    /// `n x n` quads, each split into two triangles.
    fn grid<I: MeshIndex>(n: usize, attributes: Attributes) -> Result<VgMesh<I>> {
        let mut vertices = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push([i as f64, j as f64]);
            }
        }
        let mut faces = Vec::new();
        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v01 = v00 + n + 1;
                faces.push([v00, v00 + 1, v01 + 1]);
                faces.push([v00, v01 + 1, v01]);
            }
        }
        let options = VgMeshOptions::default().with_coeffs(1).with_attributes(attributes);
        VgMesh::from_triangles(&vertices, &faces, &options)
    }

    fn gray(mesh: &mut VgMesh, level: f64) -> NodeId {
        mesh.add_node(DVector::from_element(1, level)).unwrap()
    }

    fn level(mesh: &VgMesh, node: NodeId) -> Option<f64> {
        mesh.node_value(node).unwrap().as_constraint().map(|v| v[0])
    }

    fn spoke(mesh: &VgMesh, to: usize) -> HalfEdgeId {
        mesh.topology()
            .vertex_halfedges(VertexId::new(0))
            .find(|&he| mesh.topology().dest(he).index() == to)
            .unwrap()
    }

    fn center_nodes(mesh: &VgMesh) -> Vec<NodeId> {
        let fan = mesh.topology().vertex_fan(VertexId::new(0)).unwrap();
        mesh.fan_slots(&fan).iter().map(|&s| mesh.slot_node(s)).collect()
    }

    #[test]
    fn test_empty_triangle() {
        let mut mesh = triangle(Attributes::QUADRATIC);
        let stats = finalize(&mut mesh);

        assert_eq!(stats.nodes_created, 6);
        assert_eq!(stats.slots_filled, 9);
        assert_eq!(stats.merges, 0);
        assert_eq!(mesh.unset_slot_count(), 0);
        assert_eq!(mesh.singular_faces_count(), 0);
        // Boundary half-edges stay empty
        assert!(!mesh.edge_value_node(HalfEdgeId::new(1)).unwrap().is_valid());
    }

    #[test]
    fn test_idempotent() {
        let mut mesh = fan(Attributes::FV);
        let red = gray(&mut mesh, 1.0);
        mesh.set_from_vertex_value_node(spoke(&mesh, 1), red).unwrap();

        finalize(&mut mesh);
        let once = mesh.attachments().slots().collect::<Vec<_>>();
        let count = mesh.nodes_count();

        let stats = finalize(&mut mesh);
        assert_eq!(stats, FinalizeStats::default());
        assert_eq!(mesh.attachments().slots().collect::<Vec<_>>(), once);
        assert_eq!(mesh.nodes_count(), count);
    }

    #[test]
    fn test_edge_copies_single_side() {
        let mut mesh = fan(Attributes::QUADRATIC);
        let n = gray(&mut mesh, 0.5);
        let he = spoke(&mesh, 2);
        mesh.set_edge_value_node(he, n).unwrap();

        finalize(&mut mesh);
        assert_eq!(
            mesh.halfedge_opposite_node(he, AttributeKind::EdgeValue).unwrap(),
            n
        );
    }

    #[test]
    fn test_edge_shared_constraint_untouched() {
        let mut mesh = fan(Attributes::QUADRATIC);
        let n = gray(&mut mesh, 0.75);
        let he = spoke(&mesh, 4);
        let twin = mesh.topology().twin(he);
        mesh.set_edge_value_node(he, n).unwrap();
        mesh.set_edge_value_node(twin, n).unwrap();

        finalize(&mut mesh);
        assert_eq!(mesh.edge_value_node(he).unwrap(), n);
        assert_eq!(mesh.edge_value_node(twin).unwrap(), n);
        assert_eq!(level(&mesh, n), Some(0.75));
    }

    #[test]
    fn test_edge_discontinuity_kept() {
        let mut mesh = fan(Attributes::MORLEY);
        let (p, q) = (gray(&mut mesh, 0.0), gray(&mut mesh, 1.0));
        let he = spoke(&mesh, 3);
        let twin = mesh.topology().twin(he);
        mesh.set_edge_gradient_node(he, p).unwrap();
        mesh.set_edge_gradient_node(twin, q).unwrap();

        finalize(&mut mesh);
        assert_eq!(mesh.edge_gradient_node(he).unwrap(), p);
        assert_eq!(mesh.edge_gradient_node(twin).unwrap(), q);
    }

    #[test]
    fn test_single_constraint_spreads_around_vertex() {
        let mut mesh = fan(Attributes::LINEAR);
        let red = gray(&mut mesh, 1.0);
        mesh.set_from_vertex_value_node(spoke(&mesh, 3), red).unwrap();

        let stats = finalize(&mut mesh);
        assert!(center_nodes(&mesh).iter().all(|&n| n == red));
        assert_eq!(stats.singular_runs, 0);
        assert_eq!(mesh.singular_faces_count(), 0);
    }

    #[test]
    fn test_two_constraints_make_a_singularity() {
        let mut mesh = fan(Attributes::LINEAR);
        let black = gray(&mut mesh, 0.0);
        let white = gray(&mut mesh, 1.0);
        let (h1, h3) = (spoke(&mesh, 1), spoke(&mesh, 3));
        mesh.set_from_vertex_value_node(h1, black).unwrap();
        mesh.set_from_vertex_value_node(h3, white).unwrap();

        let stats = finalize(&mut mesh);
        assert_eq!(stats.singular_runs, 2);
        assert_eq!(mesh.unset_slot_count(), 0);

        // Halfway between the two constraints, on both sides of the spoke
        let h2 = spoke(&mesh, 2);
        let mid = mesh.from_vertex_value_node(h2).unwrap();
        assert!((level(&mesh, mid).unwrap() - 0.5).abs() < 1e-10);
        assert_eq!(mesh.halfedge_opposite_node(h2, AttributeKind::FromVertexValue).unwrap(), mid);

        // The slots next to the constraints are distinct interpolated nodes
        let into_h1 = mesh.topology().twin(h1);
        let near_black = mesh.to_vertex_value_node(into_h1).unwrap();
        assert_ne!(near_black, black);
        assert_eq!(level(&mesh, near_black), Some(0.0));
        // Every corner at the center now turns its value
        assert_eq!(mesh.singular_faces_count(), 4);
    }

    #[test]
    fn test_unknown_merges_into_constraint_globally() {
        let mut mesh = fan(Attributes::LINEAR);
        let red = gray(&mut mesh, 1.0);
        let free = mesh.add_unknown_node().unwrap();
        let (h1, h3) = (spoke(&mesh, 1), spoke(&mesh, 3));
        mesh.set_from_vertex_value_node(h1, red).unwrap();
        mesh.set_from_vertex_value_node(h3, free).unwrap();

        // Also referenced away from the center vertex
        let outer = mesh.topology().next(h1);
        mesh.set_from_vertex_value_node(outer, free).unwrap();

        let stats = finalize(&mut mesh);
        assert_eq!(stats.merges, 1);
        assert!(center_nodes(&mesh).iter().all(|&n| n == red));
        assert_eq!(mesh.from_vertex_value_node(outer).unwrap(), red);
    }

    #[test]
    fn test_two_unknowns_merge() {
        let mut mesh = fan(Attributes::LINEAR);
        let p = mesh.add_unknown_node().unwrap();
        let q = mesh.add_unknown_node().unwrap();
        mesh.set_from_vertex_value_node(spoke(&mesh, 1), p).unwrap();
        mesh.set_from_vertex_value_node(spoke(&mesh, 3), q).unwrap();

        let stats = finalize(&mut mesh);
        assert_eq!(stats.merges, 1);
        let nodes = center_nodes(&mesh);
        assert!(nodes.iter().all(|&n| n == p));
    }

    #[test]
    fn test_equal_constraints_are_not_merged() {
        let mut mesh = fan(Attributes::LINEAR);
        let a = gray(&mut mesh, 0.5);
        let b = gray(&mut mesh, 0.5);
        mesh.set_from_vertex_value_node(spoke(&mesh, 1), a).unwrap();
        mesh.set_from_vertex_value_node(spoke(&mesh, 3), b).unwrap();

        let stats = finalize(&mut mesh);
        assert_eq!(stats.merges, 0);
        assert_eq!(stats.singular_runs, 0);
        assert_eq!(mesh.from_vertex_value_node(spoke(&mesh, 3)).unwrap(), b);
        assert_eq!(mesh.from_vertex_value_node(spoke(&mesh, 2)).unwrap(), a);
    }

    #[test]
    fn test_open_fan_leading_run() {
        let mut mesh = triangle(Attributes::LINEAR);
        let red = gray(&mut mesh, 1.0);
        // To-slot of the corner at vertex 0, the last slot of its fan
        let into_0 = HalfEdgeId::new(4);
        assert_eq!(mesh.topology().dest(into_0), VertexId::new(0));
        mesh.set_to_vertex_value_node(into_0, red).unwrap();

        finalize(&mut mesh);
        let out_of_0 = mesh.topology().next(into_0);
        assert_eq!(mesh.from_vertex_value_node(out_of_0).unwrap(), red);
        assert!(!mesh.is_singular(out_of_0));
    }

    #[test]
    fn test_fan_runs() {
        let closed = fan_runs(true, &[2], 4);
        assert_eq!(closed, vec![Run { before: 2, interior: vec![3, 0, 1], after: 2 }]);

        let closed = fan_runs(true, &[0, 1, 3], 4);
        assert_eq!(closed, vec![Run { before: 1, interior: vec![2], after: 3 }]);

        let open = fan_runs(false, &[2, 4], 6);
        assert_eq!(
            open,
            vec![
                Run { before: 2, interior: vec![0, 1], after: 2 },
                Run { before: 2, interior: vec![3], after: 4 },
                Run { before: 4, interior: vec![5], after: 4 },
            ]
        );
    }

    #[test]
    fn test_small_index_fills_every_slot() {
        // 21840 half-edges: three kinds fit in u16 handles, four do not
        let mut mesh = grid::<u16>(60, Attributes::QUADRATIC).unwrap();
        assert_eq!(mesh.topology().num_halfedges(), 21840);

        let stats = finalize(&mut mesh);
        assert_eq!(mesh.unset_slot_count(), 0);
        assert_eq!(mesh.nodes_count(), stats.nodes_created);
        assert!(mesh.nodes_count() <= mesh.nodes().capacity());
        for kind in mesh.attributes().kinds() {
            for he in mesh.topology().halfedge_ids() {
                let node = mesh.halfedge_node(he, kind).unwrap();
                assert!(!node.is_valid() || mesh.is_valid_node(node));
            }
        }

        assert_eq!(
            mesh.set_attributes(Attributes::FV).unwrap_err(),
            MeshError::CapacityExceeded {
                what: "attachment slot",
                requested: 87360,
                capacity: 65535
            }
        );
        assert_eq!(mesh.attributes(), Attributes::QUADRATIC);
        assert!(matches!(
            grid::<u16>(60, Attributes::FV).unwrap_err(),
            MeshError::CapacityExceeded { requested: 87360, .. }
        ));
    }

    #[test]
    fn test_full_store_collects_before_filling() {
        let vertices = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let options = VgMeshOptions::default().with_coeffs(1).with_attributes(Attributes::QUADRATIC);
        let mut mesh: VgMesh<u16> = VgMesh::from_triangles(&vertices, &[[0, 1, 2]], &options).unwrap();

        let mut kept = NodeId::invalid();
        while let Ok(node) = mesh.add_unknown_node() {
            kept = node;
        }
        assert_eq!(mesh.nodes_count(), mesh.nodes().capacity());
        let he = HalfEdgeId::new(0);
        mesh.set_from_vertex_value_node(he, kept).unwrap();

        finalize(&mut mesh);
        assert_eq!(mesh.unset_slot_count(), 0);
        // The attached node survives as the only old one, then 3 edges and 2 vertices
        assert_eq!(mesh.nodes_count(), 6);
        assert_eq!(mesh.from_vertex_value_node(he).unwrap(), NodeId::new(0));
        let into = mesh.topology().prev(he);
        assert_eq!(mesh.to_vertex_value_node(into).unwrap(), NodeId::new(0));
    }
}
