//! # vgmesh
//!
//! A node-based constraint model for half-edge vector graphics meshes.
//!
//! Triangles of a [`VgMesh`](mesh::VgMesh) carry per-corner and per-edge
//! *nodes*: fixed values (constraints) or unknowns a finite-element solver
//! has to determine. While a mesh is authored the assignment of nodes to
//! attachment slots is sparse; the passes in [`algo`] complete it, reduce it
//! and collect the nodes nothing references anymore.
//!
//! ## Features
//!
//! - **Half-edge topology**: O(1) adjacency queries with type-safe indices
//! - **Flexible indexing**: Support for 16-bit, 32-bit, and 64-bit indices
//! - **Runtime sizes**: value coefficients and domain dimension are chosen
//!   per mesh
//! - **Singularities**: adjacent corners around a vertex may reference
//!   different nodes
//! - **Finalize / simplify**: complete a partial assignment, or reduce a
//!   complete one to what finalize rebuilds
//!
//! ## Quick Start
//!
//! ```
//! use vgmesh::prelude::*;
//! use nalgebra::DVector;
//!
//! // Two triangles sharing the edge (0, 2)
//! let vertices = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
//! let faces = [[0, 1, 2], [0, 2, 3]];
//! let options = VgMeshOptions::default().with_coeffs(3);
//! let mut mesh: VgMesh = VgMesh::from_triangles(&vertices, &faces, &options).unwrap();
//!
//! // Color every corner around vertex 1 red
//! let red = mesh.add_node(DVector::from_vec(vec![1.0, 0.0, 0.0])).unwrap();
//! let he = mesh.topology().vertex_halfedges(VertexId::new(1)).next().unwrap();
//! mesh.set_vertex_arc(red, he, he).unwrap();
//!
//! // Fill every remaining slot
//! finalize(&mut mesh);
//! assert_eq!(mesh.unset_slot_count(), 0);
//!
//! // And reduce the mesh again
//! let stats = simplify(&mut mesh);
//! assert!(stats.slots_cleared > 0);
//! assert_eq!(mesh.nodes_count(), 1);
//! ```
//!
//! ## Mesh Traversal
//!
//! The half-edge structure enables efficient traversal of mesh elements:
//!
//! ```
//! use vgmesh::prelude::*;
//!
//! # let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
//! # let faces = [[0, 1, 2]];
//! # let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! // Iterate over neighbors of a vertex, counter-clockwise
//! let v = VertexId::new(0);
//! for neighbor in mesh.vertex_neighbors(v) {
//!     println!("Neighbor: {:?}", neighbor);
//! }
//!
//! // Get vertices of a face
//! let f = FaceId::new(0);
//! let [v0, v1, v2] = mesh.face_triangle(f);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use vgmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{delete_unused_nodes, finalize, simplify};
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_triangles, to_face_vertex, AttributeKind, Attributes, EdgeId, FaceId,
        HalfEdgeId, HalfEdgeMesh, MeshIndex, NodeId, NodeValue, VertexId, VgMesh, VgMeshOptions,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
