//! Core mesh data structures.
//!
//! This module provides the half-edge topology and the value model layered
//! on top of it.
//!
//! # Overview
//!
//! [`HalfEdgeMesh`] is a manifold triangle mesh stored as a half-edge
//! (doubly-connected edge list) structure with O(1) adjacency queries.
//! Positions are [`nalgebra::DVector`]s, so the same code serves 2D images
//! and higher-dimensional domains.
//!
//! [`VgMesh`] wraps a topology and attaches *nodes* to it. A node is either a
//! constraint value or an unknown; nodes live in a [`NodeStore`] and are
//! referenced from the per-half-edge slots of an [`AttachmentTable`].
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`EdgeId`] - Identifies a full edge
//! - [`NodeId`] - Identifies a node
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size. Every
//! index type has an `invalid()` sentinel; an attachment slot holding
//! `NodeId::invalid()` has no node assigned.
//!
//! # Construction
//!
//! ```
//! use vgmesh::mesh::{build_from_triangles, HalfEdgeMesh, VgMesh, VgMeshOptions};
//!
//! let vertices = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];
//! let faces = [[0, 1, 2]];
//!
//! let topology: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! let mesh = VgMesh::new(topology, &VgMeshOptions::default()).unwrap();
//! assert_eq!(mesh.unset_slot_count(), 9);
//! ```

mod attributes;
mod builder;
mod halfedge;
mod index;
mod node;
mod vg_mesh;

pub use attributes::{AttachmentTable, AttributeKind, Attributes};
pub use builder::{build_from_triangles, to_face_vertex};
pub use halfedge::{
    Face, FaceHalfEdgeIter, HalfEdge, HalfEdgeMesh, Vertex, VertexFan, VertexHalfEdgeIter,
};
pub use index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, NodeId, VertexId};
pub use node::{NodeStore, NodeValue};
pub use vg_mesh::{Slot, VgMesh, VgMeshOptions};

pub(crate) use vg_mesh::spread_positions;
