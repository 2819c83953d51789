//! Batch passes over a [`VgMesh`](crate::mesh::VgMesh).
//!
//! - **Finalize**: complete a sparse node assignment
//! - **Simplify**: reduce a complete assignment to what finalize rebuilds
//! - **Garbage collection**: delete nodes no slot references
//!
//! Every pass needs exclusive access to the mesh for its whole duration and
//! runs to completion; none of them fails on a well-formed mesh. Each returns
//! a small stats struct describing what it did.

pub mod finalize;
pub mod gc;
pub mod simplify;

mod union_find;

pub use finalize::{finalize, FinalizeStats};
pub use gc::{delete_unused_nodes, GcStats};
pub use simplify::{simplify, SimplifyStats};
