//! Garbage collection of unused nodes.
//!
//! Liveness of a node is never tracked while the mesh is edited. Instead
//! [`delete_unused_nodes`] scans every enabled attachment slot, marks the
//! nodes they reference, compacts the node store and rewrites every slot to
//! the compacted handles. Vertex gradient constraints are stored as plain
//! values and do not keep nodes alive.

use crate::mesh::{MeshIndex, NodeId, VgMesh};

/// Outcome of a garbage collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Number of nodes before the pass.
    pub nodes_before: usize,
    /// Number of nodes after the pass.
    pub nodes_after: usize,
}

impl GcStats {
    /// Number of nodes removed.
    pub fn removed(&self) -> usize {
        self.nodes_before - self.nodes_after
    }
}

/// Remove every node no enabled attachment slot references.
///
/// Surviving nodes keep their relative order; all slots are rewritten to the
/// new handles before this returns, so handles obtained before the call must
/// not be reused afterwards.
///
/// # Example
///
/// ```
/// use vgmesh::prelude::*;
/// use vgmesh::algo::delete_unused_nodes;
///
/// let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
/// let mut mesh: VgMesh = VgMesh::from_triangles(&vertices, &[[0, 1, 2]], &VgMeshOptions::default()).unwrap();
///
/// let orphan = mesh.add_unknown_node().unwrap();
/// let used = mesh.add_unknown_node().unwrap();
/// mesh.set_edge_value_node(HalfEdgeId::new(0), used).unwrap();
///
/// let stats = delete_unused_nodes(&mut mesh);
/// assert_eq!(stats.removed(), 1);
/// assert_eq!(mesh.edge_value_node(HalfEdgeId::new(0)).unwrap(), orphan);
/// ```
pub fn delete_unused_nodes<I: MeshIndex>(mesh: &mut VgMesh<I>) -> GcStats {
    let nodes_before = mesh.nodes.len();

    // Mark
    let live: Vec<bool> = reference_counts(mesh).into_iter().map(|c| c > 0).collect();

    // Sweep
    let remap = mesh.nodes.compact(&live);
    for slot in mesh.attachments.slots_mut() {
        if slot.is_valid() {
            *slot = remap.get(slot.index()).copied().unwrap_or_else(NodeId::invalid);
        }
    }

    let stats = GcStats {
        nodes_before,
        nodes_after: mesh.nodes.len(),
    };
    log::debug!(
        "deleted {} unused nodes ({} -> {})",
        stats.removed(),
        stats.nodes_before,
        stats.nodes_after
    );
    stats
}

/// Number of enabled slots referencing each node, boundary half-edges
/// included.
pub(crate) fn reference_counts<I: MeshIndex>(mesh: &VgMesh<I>) -> Vec<usize> {
    let mut counts = vec![0; mesh.nodes.len()];
    for node in mesh.attachments.slots() {
        if let Some(count) = counts.get_mut(node.index()).filter(|_| node.is_valid()) {
            *count += 1;
        }
    }
    counts
}
