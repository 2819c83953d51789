//! Error types for vgmesh.
//!
//! Node and attachment accessors fail fast with one of these errors rather
//! than returning a default value. Finalize, simplify and the garbage
//! collector never fail on a well-formed mesh.

use thiserror::Error;

use crate::mesh::AttributeKind;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// A directed edge is used by more than one face.
    #[error("edge ({v0}, {v1}) is used twice with the same orientation")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// A vertex joins more than one fan of faces (bow-tie).
    #[error("vertex {vertex} has more than one boundary gap")]
    NonManifoldVertex {
        /// The vertex index.
        vertex: usize,
    },

    /// A handle is out of range or does not name a live element.
    #[error("invalid {kind} handle {index}")]
    InvalidHandle {
        /// Element kind ("node", "vertex", "halfedge", ...).
        kind: &'static str,
        /// Raw index of the handle.
        index: usize,
    },

    /// The attachment kind is not enabled on this mesh.
    #[error("attribute {attribute:?} is not enabled on this mesh")]
    AttributeDisabled {
        /// The disabled attachment kind.
        attribute: AttributeKind,
    },

    /// A vertex gradient constraint was read but never set.
    #[error("vertex {vertex} has no gradient constraint")]
    NoGradientConstraint {
        /// The vertex index.
        vertex: usize,
    },

    /// A value does not have the size configured on the mesh.
    #[error("{what} has size {actual}, expected {expected}")]
    DimensionMismatch {
        /// What was being checked.
        what: &'static str,
        /// The configured size.
        expected: usize,
        /// The size that was supplied.
        actual: usize,
    },

    /// The index type cannot address as many elements as requested.
    #[error("{what} count {requested} exceeds the index capacity {capacity}")]
    CapacityExceeded {
        /// What was being counted.
        what: &'static str,
        /// The number of elements needed.
        requested: usize,
        /// The number of elements the index type can address.
        capacity: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    pub(crate) fn invalid_handle(kind: &'static str, index: usize) -> Self {
        MeshError::InvalidHandle { kind, index }
    }
}
